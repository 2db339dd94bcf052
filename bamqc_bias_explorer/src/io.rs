use std::{collections::HashMap, path::Path};

use anyhow::Context;
use compress_io::compress::CompressIo;

use utils::get_next_line;

/// One observation: read count plus reference features
pub struct CountRecord {
    pub reference: String,
    pub count: f64,
    pub length: f64,
    pub gc: f64,
    pub target: Option<f64>,
}

fn column<'a>(header: &[&'a str], name: &str, fname: &Path) -> anyhow::Result<usize> {
    header
        .iter()
        .position(|&f| f == name)
        .ok_or_else(|| anyhow!("Missing {} column in {}", name, fname.display()))
}

fn parse_field(fields: &[&str], ix: usize, fname: &Path, line: usize) -> anyhow::Result<f64> {
    fields
        .get(ix)
        .ok_or_else(|| anyhow!("{}:{} Short line", fname.display(), line))?
        .parse::<f64>()
        .with_context(|| format!("{}:{} Error reading numeric field", fname.display(), line))
}

/// Read the counts table produced by the read counting tool with features
/// (Reference, Count, Length, GC columns)
pub fn read_counts_file<S: AsRef<Path>>(fname: S) -> anyhow::Result<Vec<CountRecord>> {
    let fname = fname.as_ref();
    trace!("Opening counts file {} for reading", fname.display());
    let mut rdr = CompressIo::new()
        .path(fname)
        .bufreader()
        .with_context(|| format!("Error opening counts file {}", fname.display()))?;

    let mut buf = String::new();
    let header = get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error reading header from {}", fname.display()))?
        .ok_or_else(|| anyhow!("Empty counts file {}", fname.display()))?;
    let ref_ix = column(&header, "Reference", fname)?;
    let count_ix = column(&header, "Count", fname)?;
    let len_ix = column(&header, "Length", fname)?;
    let gc_ix = column(&header, "GC", fname)?;

    let mut v = Vec::new();
    let mut line = 1;
    let mut buf = String::new();
    while let Some(fields) = get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error after reading {} lines from {}", line, fname.display()))?
    {
        line += 1;
        if fields.len() <= 1 {
            // Skip blank lines
            continue;
        }
        let reference = fields
            .get(ref_ix)
            .ok_or_else(|| anyhow!("{}:{} Short line", fname.display(), line))?
            .to_string();
        v.push(CountRecord {
            reference,
            count: parse_field(&fields, count_ix, fname, line)?,
            length: parse_field(&fields, len_ix, fname, line)?,
            gc: parse_field(&fields, gc_ix, fname, line)?,
            target: None,
        });
    }
    debug!("Read {} count records from {}", v.len(), fname.display());
    Ok(v)
}

/// Read the target table (Reference, Count columns) mapping reference name
/// to its true concentration
pub fn read_target_file<S: AsRef<Path>>(fname: S) -> anyhow::Result<HashMap<String, f64>> {
    let fname = fname.as_ref();
    trace!("Opening target file {} for reading", fname.display());
    let mut rdr = CompressIo::new()
        .path(fname)
        .bufreader()
        .with_context(|| format!("Error opening target file {}", fname.display()))?;

    let mut buf = String::new();
    let header = get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error reading header from {}", fname.display()))?
        .ok_or_else(|| anyhow!("Empty target file {}", fname.display()))?;
    let ref_ix = column(&header, "Reference", fname)?;
    let count_ix = column(&header, "Count", fname)?;

    let mut h = HashMap::new();
    let mut line = 1;
    let mut buf = String::new();
    while let Some(fields) = get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error after reading {} lines from {}", line, fname.display()))?
    {
        line += 1;
        if fields.len() <= 1 {
            continue;
        }
        let reference = fields
            .get(ref_ix)
            .ok_or_else(|| anyhow!("{}:{} Short line", fname.display(), line))?
            .to_string();
        h.insert(reference, parse_field(&fields, count_ix, fname, line)?);
    }
    debug!("Read {} target records from {}", h.len(), fname.display());
    Ok(h)
}

/// Merge target values into the count records, dropping rows missing on
/// either side
pub fn merge_target(data: &mut Vec<CountRecord>, targets: &HashMap<String, f64>) {
    for rec in data.iter_mut() {
        rec.target = targets.get(&rec.reference).copied();
    }
    let before = data.len();
    data.retain(|r| r.target.is_some());
    if data.len() < before {
        warn!(
            "Dropped {} references with no target value",
            before - data.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tsv(name: &str, content: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(name);
        let mut f = std::fs::File::create(&p).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        p
    }

    #[test]
    fn counts_round_trip() {
        let p = write_tsv(
            "bias_counts_test.tsv",
            "Reference\tCount\tLength\tGC\nref1\t100\t1500\t0.4500\nref2\t7\t800\t0.6000\n",
        );
        let v = read_counts_file(&p).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].reference, "ref1");
        assert_eq!(v[0].count, 100.0);
        assert_eq!(v[1].length, 800.0);
        assert!((v[1].gc - 0.6).abs() < 1e-12);
        std::fs::remove_file(&p).ok();
    }

    #[test]
    fn missing_column_is_an_error() {
        let p = write_tsv(
            "bias_counts_bad_test.tsv",
            "Reference\tCount\nref1\t100\n",
        );
        assert!(read_counts_file(&p).is_err());
        std::fs::remove_file(&p).ok();
    }

    #[test]
    fn target_merge_drops_missing_rows() {
        let mut data = vec![
            CountRecord {
                reference: "ref1".to_string(),
                count: 10.0,
                length: 100.0,
                gc: 0.5,
                target: None,
            },
            CountRecord {
                reference: "ref2".to_string(),
                count: 20.0,
                length: 200.0,
                gc: 0.4,
                target: None,
            },
        ];
        let mut targets = HashMap::new();
        targets.insert("ref2".to_string(), 3.5);
        merge_target(&mut data, &targets);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].reference, "ref2");
        assert_eq!(data[0].target, Some(3.5));
    }
}
