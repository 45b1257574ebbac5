use crate::common_io::{mkdir, read_lines_of_types, write_lines, Delimiter};
use crate::traits::IoOps;
use ndarray::prelude::*;
use std::fmt::Display;
use std::str::FromStr;

impl<T> IoOps for Array2<T>
where
    T: FromStr + Send + Display,
    <T as FromStr>::Err: Display,
{
    type Scalar = T;
    type Mat = Self;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat> {
        let hdr_line = match skip {
            Some(skip) => skip as i64,
            None => -1, // no skipping
        };

        let rows = read_lines_of_types::<T>(file, delim, hdr_line)?.lines;

        if rows.is_empty() {
            return Err(anyhow::anyhow!("No data in file {}", file));
        }

        let nrows = rows.len();
        let ncols = rows[0].len();

        if let Some(i) = rows.iter().position(|r| r.len() != ncols) {
            return Err(anyhow::anyhow!(
                "row {} has {} columns, expected {}",
                i,
                rows[i].len(),
                ncols
            ));
        }

        let data = rows.into_iter().flatten().collect::<Vec<_>>();
        Ok(Array2::from_shape_vec((nrows, ncols), data)?)
    }

    fn write_file_delim(&self, file: &str, delim: &str) -> anyhow::Result<()> {
        mkdir(file)?;
        let lines: Vec<Box<str>> = self
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|x| x.to_string())
                    .collect::<Vec<String>>()
                    .join(delim)
                    .into_boxed_str()
            })
            .collect();
        write_lines(&lines, file)
    }
}
