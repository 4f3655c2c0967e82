use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;
use serde::Serialize;

use super::grammar::{END_MARK_IDX, EPSILON_IDX};
use crate::error::GrammarError;
use crate::Grammar;

/// Ordinal of the augmented production `S' -> S`.
pub const AUGMENTED: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DotProduction {
    pub ordinal: usize,
    pub position: usize,
}

fn skip_epsilon(right: &[usize], mut position: usize) -> usize {
    while position < right.len() && right[position] == EPSILON_IDX {
        position += 1;
    }
    position
}

impl DotProduction {
    pub fn new(g: &Grammar, ordinal: usize) -> Self {
        Self {
            ordinal,
            position: skip_epsilon(g.item_right(ordinal), 0),
        }
    }

    pub fn generate_next(&self, g: &Grammar) -> Self {
        Self {
            ordinal: self.ordinal,
            position: skip_epsilon(g.item_right(self.ordinal), self.position + 1),
        }
    }

    pub fn next_symbol(&self, g: &Grammar) -> Option<usize> {
        g.item_right(self.ordinal).get(self.position).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LRItem {
    pub kernel: BTreeSet<DotProduction>,
    pub extend: BTreeSet<DotProduction>,
    pub edges: BTreeMap<usize, usize>,
}

impl LRItem {
    fn new(kernel: BTreeSet<DotProduction>) -> Self {
        Self {
            kernel,
            extend: BTreeSet::new(),
            edges: BTreeMap::new(),
        }
    }

    fn calculate_extend(&mut self, g: &Grammar) {
        let mut queued: BTreeSet<usize> = BTreeSet::new();
        let mut q: VecDeque<usize> = VecDeque::new();

        for c in &self.kernel {
            if let Some(s) = c.next_symbol(g).filter(|&s| g.is_non_terminal(s)) {
                if queued.insert(s) {
                    q.push_back(s);
                }
            }
        }

        while let Some(nt) = q.pop_front() {
            for (p, _) in g.productions().filter(|(p, _)| p.left == nt) {
                let item = DotProduction::new(g, p.ordinal);
                if !self.kernel.contains(&item) {
                    self.extend.insert(item);
                }
                if let Some(s) = item.next_symbol(g).filter(|&s| g.is_non_terminal(s)) {
                    if queued.insert(s) {
                        q.push_back(s);
                    }
                }
            }
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &DotProduction> {
        self.kernel.iter().chain(self.extend.iter())
    }
}

/// The canonical LR(0) collection.
#[derive(Debug, Clone, Serialize)]
pub struct LRFSM {
    pub states: Vec<LRItem>,
    pub start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LRParsingTableAction {
    Shift(usize),
    /// Reduce by the production with this ordinal.
    Reduce(usize),
    Accept,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SLRParsingTable {
    /// Per state: terminal or `$` -> every applicable action.
    pub action: Vec<BTreeMap<usize, Vec<LRParsingTableAction>>>,
    /// Per state: non-terminal -> state.
    pub goto: Vec<BTreeMap<usize, usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SLRConflict {
    pub state: usize,
    pub terminal: String,
    pub actions: Vec<LRParsingTableAction>,
}

impl SLRParsingTable {
    pub fn conflicts(&self, g: &Grammar) -> Vec<SLRConflict> {
        let mut conflicts = Vec::new();
        for (state, row) in self.action.iter().enumerate() {
            for (&t, actions) in row {
                if actions.len() > 1 {
                    conflicts.push(SLRConflict {
                        state,
                        terminal: g.get_symbol_name(t).to_string(),
                        actions: actions.clone(),
                    });
                }
            }
        }
        conflicts
    }

    pub fn is_slr1(&self) -> bool {
        self.action
            .iter()
            .all(|row| row.values().all(|actions| actions.len() <= 1))
    }
}

impl LRFSM {
    pub fn to_slr_table(&self, g: &Grammar) -> Result<SLRParsingTable, GrammarError> {
        let mut table = SLRParsingTable::default();

        for state in &self.states {
            let mut action: BTreeMap<usize, Vec<LRParsingTableAction>> = BTreeMap::new();
            let mut goto: BTreeMap<usize, usize> = BTreeMap::new();

            for (&e, &v) in &state.edges {
                if g.is_non_terminal(e) {
                    goto.insert(e, v);
                } else {
                    action
                        .entry(e)
                        .or_default()
                        .push(LRParsingTableAction::Shift(v));
                }
            }

            for item in state.items() {
                if item.next_symbol(g).is_some() {
                    continue;
                }
                match g.item_left(item.ordinal) {
                    None => action
                        .entry(END_MARK_IDX)
                        .or_default()
                        .push(LRParsingTableAction::Accept),
                    Some(left) => {
                        for t in g.follow_of(left)? {
                            let cell = action.entry(t).or_default();
                            let reduce = LRParsingTableAction::Reduce(item.ordinal);
                            if !cell.contains(&reduce) {
                                cell.push(reduce);
                            }
                        }
                    }
                }
            }

            table.action.push(action);
            table.goto.push(goto);
        }

        Ok(table)
    }
}

impl Grammar {
    /// Right side of an item's production; the augmented production is
    /// `S' -> S`.
    pub fn item_right(&self, ordinal: usize) -> &[usize] {
        if ordinal == AUGMENTED {
            return std::slice::from_ref(&self.start_symbol);
        }
        self.production(ordinal)
            .map(|(_, right)| right)
            .unwrap_or(&[])
    }

    /// `None` for the augmented production.
    pub fn item_left(&self, ordinal: usize) -> Option<usize> {
        self.production(ordinal).map(|(p, _)| p.left)
    }

    pub fn to_lr0_fsm(&self) -> LRFSM {
        let mut start_state = LRItem::new(BTreeSet::from([DotProduction::new(self, AUGMENTED)]));
        start_state.calculate_extend(self);
        let mut states = vec![start_state];
        let mut q: VecDeque<usize> = VecDeque::new();
        q.push_back(0);

        while let Some(u) = q.pop_front() {
            let mut edges: BTreeMap<usize, LRItem> = BTreeMap::new();

            for production in states[u].items() {
                if let Some(e) = production.next_symbol(self) {
                    edges
                        .entry(e)
                        .or_insert_with(|| LRItem::new(BTreeSet::new()))
                        .kernel
                        .insert(production.generate_next(self));
                }
            }

            for (e, mut v) in edges {
                let v_idx = match states.iter().position(|s| s.kernel == v.kernel) {
                    Some(i) => i,
                    None => {
                        v.calculate_extend(self);
                        states.push(v);
                        q.push_back(states.len() - 1);
                        states.len() - 1
                    }
                };
                states[u].edges.insert(e, v_idx);
            }
        }

        debug!("LR(0) automaton has {} states", states.len());
        LRFSM { states, start: 0 }
    }
}
