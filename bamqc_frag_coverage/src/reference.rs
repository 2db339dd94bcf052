use std::{collections::HashMap, io::BufRead, path::Path, sync::Arc};

use anyhow::Context;
use compress_io::compress::CompressIo;

/// Read in next line.
fn get_next_line<R: BufRead>(rdr: &mut R, buf: &mut String) -> anyhow::Result<bool> {
    buf.clear();
    if rdr.read_line(buf)? == 0 {
        Ok(false)
    } else {
        Ok(true)
    }
}

/// RefSet
///
/// Reference names in the order they appear in the FASTA file, with the
/// sequence length of each reference
pub struct RefSet {
    names: Vec<Arc<str>>,
    lengths: HashMap<Arc<str>, usize>,
}

impl RefSet {
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn length(&self, name: &str) -> Option<usize> {
        self.lengths.get(name).copied()
    }

    /// Get the shared name for a reference if it is part of the set
    pub fn get_name(&self, name: &str) -> Option<&Arc<str>> {
        self.lengths.get_key_value(name).map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, usize)> {
        self.names.iter().map(move |n| (n, self.lengths[n]))
    }

    /// Scan a FASTA file collecting the length of every sequence
    pub fn from_fasta<S: AsRef<Path>>(fname: S) -> anyhow::Result<Self> {
        let fname = fname.as_ref();
        debug!("Reading reference lengths from {}", fname.display());

        trace!("Opening reference file for reading");
        let mut rdr = CompressIo::new()
            .path(fname)
            .bufreader()
            .with_context(|| format!("Error opening reference file {}", fname.display()))?;

        trace!("Reading from reference file");
        let mut buf = String::new();
        let mut line = 0;
        let mut names = Vec::new();
        let mut lengths: HashMap<Arc<str>, usize> = HashMap::new();
        let mut current: Option<Arc<str>> = None;
        while get_next_line(&mut rdr, &mut buf)
            .with_context(|| format!("Error after reading {} lines from {}", line, fname.display()))?
        {
            line += 1;
            if buf.starts_with('>') {
                // New reference
                if let Some(name) = buf.trim_start_matches('>').split_ascii_whitespace().next() {
                    let name: Arc<str> = Arc::from(name);
                    if lengths.contains_key(&name) {
                        return Err(anyhow!(
                            "Duplicate reference {} at line {} of {}",
                            name,
                            line,
                            fname.display()
                        ));
                    }
                    trace!("Processing reference {}", name);
                    names.push(Arc::clone(&name));
                    lengths.insert(Arc::clone(&name), 0);
                    current = Some(name);
                } else {
                    return Err(anyhow!("Missing reference name at line {}", line));
                }
            } else if let Some(name) = current.as_ref() {
                *lengths.get_mut(name).expect("Missing current reference") +=
                    buf.trim_end().len();
            }
        }
        debug!(
            "Finished reading in {} lines; found {} references",
            line,
            names.len()
        );
        Ok(Self { names, lengths })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fasta(name: &str, content: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(name);
        let mut f = std::fs::File::create(&p).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        p
    }

    #[test]
    fn lengths_from_fasta() {
        let p = write_fasta(
            "frag_cov_refset_test.fa",
            ">ref1 description\nACGTACGT\nACGT\n>ref2\nGGCC\n",
        );
        let refs = RefSet::from_fasta(&p).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs.length("ref1"), Some(12));
        assert_eq!(refs.length("ref2"), Some(4));
        assert_eq!(refs.names()[0].as_ref(), "ref1");
        assert!(refs.length("ref3").is_none());
        std::fs::remove_file(&p).ok();
    }

    #[test]
    fn duplicate_reference_is_an_error() {
        let p = write_fasta(
            "frag_cov_refset_dup_test.fa",
            ">ref1\nACGT\n>ref1\nGGCC\n",
        );
        assert!(RefSet::from_fasta(&p).is_err());
        std::fs::remove_file(&p).ok();
    }
}
