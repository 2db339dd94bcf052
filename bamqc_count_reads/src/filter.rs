use std::collections::HashSet;

use rust_htslib::bam::{self, record::Aux};

/// The two record properties the top-per-query filter reads
pub trait QueryScored {
    fn query_name(&self) -> &[u8];
    fn alignment_score(&self) -> i64;
}

impl QueryScored for bam::Record {
    fn query_name(&self) -> &[u8] {
        self.qname()
    }

    fn alignment_score(&self) -> i64 {
        alignment_score(self)
    }
}

/// Alignment score from the AS aux tag.  A record without the tag, or with a
/// non-integer payload, scores 0.
pub fn alignment_score(rec: &bam::Record) -> i64 {
    match rec.aux(b"AS") {
        Ok(Aux::I8(v)) => v as i64,
        Ok(Aux::U8(v)) => v as i64,
        Ok(Aux::I16(v)) => v as i64,
        Ok(Aux::U16(v)) => v as i64,
        Ok(Aux::I32(v)) => v as i64,
        Ok(Aux::U32(v)) => v as i64,
        _ => 0,
    }
}

/// TopPerQuery
///
/// Iterator adapter emitting one record per run of equal query names: the
/// first record attaining the maximal alignment score in the run.  The input
/// must be grouped by query name; a name recurring after its group has been
/// flushed is reported as an error.
pub struct TopPerQuery<I, T> {
    inner: I,
    buff: Vec<T>,
    closed: HashSet<Vec<u8>>,
    done: bool,
}

impl<I, T> TopPerQuery<I, T>
where
    I: Iterator<Item = anyhow::Result<T>>,
    T: QueryScored,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            buff: Vec::new(),
            closed: HashSet::new(),
            done: false,
        }
    }

    fn flush(&mut self) -> T {
        self.closed.insert(self.buff[0].query_name().to_vec());
        let mut best = 0;
        for (i, r) in self.buff.iter().enumerate().skip(1) {
            if r.alignment_score() > self.buff[best].alignment_score() {
                best = i
            }
        }
        let rec = self.buff.swap_remove(best);
        self.buff.clear();
        rec
    }
}

impl<I, T> Iterator for TopPerQuery<I, T>
where
    I: Iterator<Item = anyhow::Result<T>>,
    T: QueryScored,
{
    type Item = anyhow::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.inner.next() {
                Some(Ok(rec)) => {
                    if self.closed.contains(rec.query_name()) {
                        self.done = true;
                        return Some(Err(anyhow!(
                            "Input is not grouped by query name: {} seen in multiple groups",
                            String::from_utf8_lossy(rec.query_name())
                        )));
                    }
                    match self.buff.last() {
                        Some(last) if last.query_name() != rec.query_name() => {
                            let out = self.flush();
                            self.buff.push(rec);
                            return Some(Ok(out));
                        }
                        _ => self.buff.push(rec),
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return if self.buff.is_empty() {
                        None
                    } else {
                        Some(Ok(self.flush()))
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Rec {
        name: &'static str,
        score: i64,
        id: usize,
    }

    impl QueryScored for Rec {
        fn query_name(&self) -> &[u8] {
            self.name.as_bytes()
        }

        fn alignment_score(&self) -> i64 {
            self.score
        }
    }

    fn run(recs: Vec<Rec>) -> anyhow::Result<Vec<Rec>> {
        TopPerQuery::new(recs.into_iter().map(Ok)).collect()
    }

    #[test]
    fn one_top_record_per_group() {
        let out = run(vec![
            Rec { name: "q1", score: 10, id: 0 },
            Rec { name: "q1", score: 30, id: 1 },
            Rec { name: "q1", score: 20, id: 2 },
            Rec { name: "q2", score: 5, id: 3 },
        ])
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, 1);
        assert_eq!(out[1].id, 3);
    }

    #[test]
    fn ties_keep_the_first_record() {
        let out = run(vec![
            Rec { name: "q1", score: 7, id: 0 },
            Rec { name: "q1", score: 7, id: 1 },
            Rec { name: "q1", score: 7, id: 2 },
        ])
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 0);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(run(vec![]).unwrap().is_empty());
    }

    #[test]
    fn singleton_group_passes_through() {
        let out = run(vec![Rec { name: "q1", score: -3, id: 0 }]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 0);
    }

    #[test]
    fn groups_emit_in_input_order() {
        let out = run(vec![
            Rec { name: "b", score: 1, id: 0 },
            Rec { name: "a", score: 1, id: 1 },
            Rec { name: "c", score: 1, id: 2 },
        ])
        .unwrap();
        let names: Vec<_> = out.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn ungrouped_input_is_an_error() {
        let res = run(vec![
            Rec { name: "q1", score: 1, id: 0 },
            Rec { name: "q2", score: 1, id: 1 },
            Rec { name: "q1", score: 1, id: 2 },
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn stream_errors_propagate() {
        let recs: Vec<anyhow::Result<Rec>> = vec![
            Ok(Rec { name: "q1", score: 1, id: 0 }),
            Err(anyhow!("truncated file")),
        ];
        let res: anyhow::Result<Vec<Rec>> = TopPerQuery::new(recs.into_iter()).collect();
        assert!(res.is_err());
    }

    #[test]
    fn score_from_aux_tag() {
        let mut rec = bam::Record::new();
        assert_eq!(alignment_score(&rec), 0);
        rec.push_aux(b"AS", Aux::I32(42)).unwrap();
        assert_eq!(alignment_score(&rec), 42);

        let mut rec = bam::Record::new();
        rec.push_aux(b"AS", Aux::Float(1.5)).unwrap();
        assert_eq!(alignment_score(&rec), 0);
    }
}
