//! Tokenized documents over a fixed vocabulary.
//!
//! A cell is a document and each gene count contributes that many
//! token occurrences of the gene's vocabulary index. All tokens live in
//! one flat arena; `doc_offsets[d]..doc_offsets[d + 1]` spans document d.

use log::info;
use matrix_util::common_io::{read_lines_of_types, read_lines_of_words_delim};
use std::collections::HashSet;

/// Unique gene names indexed by dense type indices
#[derive(Debug, Clone)]
pub struct Vocabulary {
    names: Vec<Box<str>>,
}

impl Vocabulary {
    /// Build a vocabulary; names must be unique and non-empty
    pub fn new(names: Vec<Box<str>>) -> anyhow::Result<Self> {
        anyhow::ensure!(!names.is_empty(), "empty vocabulary");
        {
            let mut seen: HashSet<&str> = HashSet::with_capacity(names.len());
            if let Some(dup) = names.iter().find(|&name| !seen.insert(name.as_ref())) {
                anyhow::bail!("duplicate vocabulary entry: {}", dup);
            }
        }
        Ok(Vocabulary { names })
    }

    /// Vocabulary of `size` entries named by their indices
    pub fn anonymous(size: usize) -> anyhow::Result<Self> {
        Self::new((0..size).map(|j| j.to_string().into_boxed_str()).collect())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, word_type: usize) -> &str {
        &self.names[word_type]
    }
}

/// Immutable corpus of tokenized documents
#[derive(Debug, Clone)]
pub struct Corpus {
    word_types: Vec<usize>,
    doc_offsets: Vec<usize>,
    vocab: Vocabulary,
}

impl Corpus {
    /// Build a corpus from per-document token type lists.
    ///
    /// * `docs` - `docs[d]` lists the vocabulary index of every token of document d
    /// * `vocab` - vocabulary; every token must index into it
    pub fn from_documents(docs: &[Vec<usize>], vocab: Vocabulary) -> anyhow::Result<Self> {
        anyhow::ensure!(!docs.is_empty(), "empty corpus: no documents");

        let mut word_types = Vec::with_capacity(docs.iter().map(|d| d.len()).sum());
        let mut doc_offsets = Vec::with_capacity(docs.len() + 1);
        doc_offsets.push(0);

        for (d, doc) in docs.iter().enumerate() {
            if let Some(&bad) = doc.iter().find(|&&w| w >= vocab.len()) {
                anyhow::bail!(
                    "document {} has token type {} outside the vocabulary of {}",
                    d,
                    bad,
                    vocab.len()
                );
            }
            word_types.extend_from_slice(doc);
            doc_offsets.push(word_types.len());
        }

        anyhow::ensure!(!word_types.is_empty(), "empty corpus: no tokens");

        Ok(Corpus {
            word_types,
            doc_offsets,
            vocab,
        })
    }

    /// Build a corpus from a cell x gene count table. A count `c` at
    /// gene `j` becomes `c` consecutive tokens of type `j`, genes
    /// visited in column order.
    pub fn from_count_rows(rows: &[Vec<usize>], vocab: Vocabulary) -> anyhow::Result<Self> {
        let docs = rows
            .iter()
            .enumerate()
            .map(|(d, row)| {
                anyhow::ensure!(
                    row.len() == vocab.len(),
                    "row {} has {} counts but there are {} genes",
                    d,
                    row.len(),
                    vocab.len()
                );
                Ok(row
                    .iter()
                    .enumerate()
                    .flat_map(|(j, &c)| std::iter::repeat_n(j, c))
                    .collect::<Vec<_>>())
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Self::from_documents(&docs, vocab)
    }

    pub fn num_docs(&self) -> usize {
        self.doc_offsets.len() - 1
    }

    pub fn num_tokens(&self) -> usize {
        self.word_types.len()
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Token types of document `doc`
    #[inline]
    pub fn doc(&self, doc: usize) -> &[usize] {
        &self.word_types[self.doc_offsets[doc]..self.doc_offsets[doc + 1]]
    }

    #[inline]
    pub fn doc_len(&self, doc: usize) -> usize {
        self.doc_offsets[doc + 1] - self.doc_offsets[doc]
    }

    /// Position of the first token of `doc` in the flat arena
    #[inline]
    pub fn doc_offset(&self, doc: usize) -> usize {
        self.doc_offsets[doc]
    }

    /// Vocabulary index of the token at (`doc`, `pos`)
    #[inline]
    pub fn word_type(&self, doc: usize, pos: usize) -> usize {
        self.word_types[self.doc_offsets[doc] + pos]
    }

    /// The longest document, which bounds every per-document count
    pub fn max_doc_len(&self) -> usize {
        (0..self.num_docs())
            .map(|d| self.doc_len(d))
            .max()
            .unwrap_or(0)
    }
}

/// Read a cell x gene count matrix and its gene names.
///
/// * `data_file` - one comma-separated row of counts per cell (`.gz` ok)
/// * `genes_file` - comma-separated gene names, one per column
pub fn read_count_corpus(data_file: &str, genes_file: &str) -> anyhow::Result<Corpus> {
    let names: Vec<Box<str>> = read_lines_of_words_delim(genes_file, ",")?
        .into_iter()
        .flatten()
        .filter(|x| !x.is_empty())
        .collect();

    let vocab = Vocabulary::new(names)?;
    info!("read {} genes from {}", vocab.len(), genes_file);

    let rows = read_lines_of_types::<usize>(data_file, ",", -1)?.lines;
    info!("read {} cells from {}", rows.len(), data_file);

    let corpus = Corpus::from_count_rows(&rows, vocab)?;
    info!(
        "{} tokens, longest document has {} tokens",
        corpus.num_tokens(),
        corpus.max_doc_len()
    );
    Ok(corpus)
}
