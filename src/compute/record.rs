//! Read views handed to logic functions.

use super::history::Series;
use crate::store::LogicFailure;
use smallvec::SmallVec;

/// A lagged/windowed view over one node's history, bound to a "current" step.
///
/// The engine binds records to the step *before* the one being computed, so a
/// record never observes values that are still in progress.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    series: &'a Series,
    now: usize,
}

impl<'a> Record<'a> {
    pub fn new(series: &'a Series, now: usize) -> Self { Self { series, now } }

    /// The step lag 0 refers to.
    pub fn now(&self) -> usize { self.now }

    /// The value `lag` steps before `now`. `None` before the run began or
    /// where the node has no value (e.g. a flow at step 0).
    pub fn lag(&self, lag: usize) -> Option<f64> {
        self.now.checked_sub(lag).and_then(|step| self.series.get(step))
    }

    /// Absolute lookup, limited to steps up to `now`.
    pub fn at_step(&self, step: usize) -> Option<f64> {
        if step > self.now {
            None
        } else {
            self.series.get(step)
        }
    }

    /// Values at lags `near, near + 1, .., far - 1`, most recent first.
    ///
    /// The range is clamped to the written part of `[0, now]` instead of
    /// failing, so the result may be shorter than `far - near`.
    pub fn window(&self, near: usize, far: usize) -> Vec<f64> {
        (near..far)
            .map_while(|lag| self.now.checked_sub(lag))
            .filter_map(|step| self.series.get(step))
            .collect()
    }
}

/// One resolved logic argument.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Value(f64),
    Record(Record<'a>),
}

/// Resolved arguments of a logic call, in input declaration order.
#[derive(Debug, Clone, Default)]
pub struct Args<'a> {
    items: SmallVec<[Arg<'a>; 4]>,
}

impl<'a> Args<'a> {
    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn get(&self, i: usize) -> Option<&Arg<'a>> { self.items.get(i) }

    pub fn iter(&self) -> impl Iterator<Item = &Arg<'a>> { self.items.iter() }

    /// The point value of input `i`.
    pub fn value(&self, i: usize) -> Result<f64, LogicFailure> {
        match self.items.get(i) {
            Some(Arg::Value(v)) => Ok(*v),
            Some(Arg::Record(_)) => Err(LogicFailure(format!("input #{} is a record, not a value", i))),
            None => Err(LogicFailure(format!("input #{} is missing ({} given)", i, self.items.len()))),
        }
    }

    /// The record of input `i`.
    pub fn record(&self, i: usize) -> Result<Record<'a>, LogicFailure> {
        match self.items.get(i) {
            Some(Arg::Record(r)) => Ok(*r),
            Some(Arg::Value(_)) => Err(LogicFailure(format!("input #{} is a value, not a record", i))),
            None => Err(LogicFailure(format!("input #{} is missing ({} given)", i, self.items.len()))),
        }
    }
}

impl<'a> FromIterator<Arg<'a>> for Args<'a> {
    fn from_iter<I: IntoIterator<Item = Arg<'a>>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::history::History;
    use crate::store::{Node, Registry};
    use rstest::rstest;

    /// A stock with values 10, 11, .., 15 at steps 0..=5.
    fn history() -> (Registry, History) {
        let reg = Registry::from_nodes(vec![Node::stock("s", "s", 10.0)]).unwrap();
        let s = reg.lookup("s").unwrap();
        let mut history = History::new(reg.count());
        for step in 0..=5 {
            history.append(&reg, s, step, 10.0 + step as f64).unwrap();
        }
        (reg, history)
    }

    #[rstest]
    #[case(0, Some(15.0))]
    #[case(2, Some(13.0))]
    #[case(5, Some(10.0))]
    #[case(6, None)]
    #[case(usize::MAX, None)]
    fn test_lag(#[case] lag: usize, #[case] expected: Option<f64>) {
        let (reg, history) = history();
        let record = Record::new(history.series(reg.lookup("s").unwrap()), 5);
        assert_eq!(record.lag(lag), expected);
    }

    #[rstest]
    #[case::last_three(0, 3, vec![15.0, 14.0, 13.0])]
    #[case::offset(1, 3, vec![14.0, 13.0])]
    #[case::clamped_far_end(3, 100, vec![12.0, 11.0, 10.0])]
    #[case::entirely_before_start(6, 9, vec![])]
    #[case::empty_range(2, 2, vec![])]
    #[case::inverted_range(3, 1, vec![])]
    fn test_window(#[case] near: usize, #[case] far: usize, #[case] expected: Vec<f64>) {
        let (reg, history) = history();
        let record = Record::new(history.series(reg.lookup("s").unwrap()), 5);
        assert_eq!(record.window(near, far), expected);
    }

    #[test]
    fn test_record_hides_steps_after_now() {
        let (reg, history) = history();
        let record = Record::new(history.series(reg.lookup("s").unwrap()), 2);
        assert_eq!(record.at_step(2), Some(12.0));
        assert_eq!(record.at_step(3), None);
        assert_eq!(record.window(0, 10), vec![12.0, 11.0, 10.0]);
    }

    #[test]
    fn test_unwritten_steps_are_skipped() {
        let reg = Registry::from_nodes(vec![Node::parameter("p", "p", 1.0)]).unwrap();
        let p = reg.lookup("p").unwrap();
        let mut history = History::new(reg.count());
        history.append(&reg, p, 1, 7.0).unwrap();

        let record = Record::new(history.series(p), 1);
        assert_eq!(record.lag(1), None);
        assert_eq!(record.window(0, 5), vec![7.0]);
    }

    #[test]
    fn test_args_type_mismatch_is_a_logic_failure() {
        let (reg, history) = history();
        let record = Record::new(history.series(reg.lookup("s").unwrap()), 5);
        let args: Args<'_> = [Arg::Value(1.0), Arg::Record(record)].into_iter().collect();

        assert_eq!(args.value(0), Ok(1.0));
        assert!(args.value(1).is_err());
        assert!(args.record(0).is_err());
        assert_eq!(args.record(1).unwrap().lag(0), Some(15.0));
        assert!(args.value(2).unwrap_err().0.contains("missing"));
    }
}
