use std::cmp::Ordering;

use super::{Fill, PackingStrategy, fallback, registry};
use crate::cancel::CancelToken;
use crate::config::AtlasConfig;
use crate::error::Result;
use crate::model::{Canvas, PackItem, StrategyId};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Ordered set of strategies tried against the same candidate size.
///
/// With `PackerKind::Automatic` this is the meta-strategy: every family runs and the highest
/// fill ratio wins, ties going to the earlier registry entry. With a single packer it holds
/// that packer's heuristic variants (or just one), plus Simple Row as a fallback that only runs
/// when none of them succeeds.
pub struct Portfolio {
    strategies: Vec<Box<dyn PackingStrategy>>,
    fallback: Option<Box<dyn PackingStrategy>>,
    parallel: bool,
}

impl Portfolio {
    pub fn new(cfg: &AtlasConfig) -> Self {
        let mut p =
            Self::from_strategies(registry(cfg.packer, cfg.heuristic, cfg.sort_order), cfg.parallel);
        p.fallback = fallback(cfg.packer);
        p
    }

    pub fn from_strategies(strategies: Vec<Box<dyn PackingStrategy>>, parallel: bool) -> Self {
        Self {
            strategies,
            fallback: None,
            parallel,
        }
    }

    /// Sets the strategy tried when every regular strategy fails.
    pub fn with_fallback(mut self, strategy: Box<dyn PackingStrategy>) -> Self {
        self.fallback = Some(strategy);
        self
    }

    pub fn ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub fn fallback_id(&self) -> Option<StrategyId> {
        self.fallback.as_ref().map(|s| s.id())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// All-or-nothing attempt at `width x height`. Successful canvases pass through `finish`
    /// (tightening to the used extent) before their fill ratios are compared.
    pub fn try_pack(
        &self,
        items: &[PackItem],
        width: u32,
        height: u32,
        allow_rotation: bool,
        cancel: &CancelToken,
        finish: &(dyn Fn(Canvas) -> Canvas + Sync),
    ) -> Result<Option<Canvas>> {
        let attempt = |s: &dyn PackingStrategy| {
            let out = s.try_pack(items, width, height, allow_rotation).map(finish);
            debug!(strategy = %s.id(), width, height, ok = out.is_some(), "strategy attempt");
            out
        };
        let results = self.run(cancel, &attempt)?;
        let mut best: Option<Canvas> = None;
        for canvas in results.into_iter().flatten() {
            match &best {
                Some(b) if compare_fill(&canvas, b) != Ordering::Greater => {}
                _ => best = Some(canvas),
            }
        }
        if best.is_none() {
            if let Some(fb) = &self.fallback {
                cancel.check()?;
                best = attempt(fb.as_ref());
            }
        }
        Ok(best)
    }

    /// Greedy partial fill; the most placed area wins, ties going to the earlier entry.
    /// The fallback replaces a partial result only when it places every item.
    pub fn best_fill(
        &self,
        items: &[PackItem],
        width: u32,
        height: u32,
        allow_rotation: bool,
        cancel: &CancelToken,
    ) -> Result<Option<(StrategyId, Fill)>> {
        let results = self.run(cancel, |s| (s.id(), s.fill(items, width, height, allow_rotation)))?;
        let mut best: Option<(StrategyId, Fill)> = None;
        for (id, fill) in results {
            match &best {
                Some((_, b)) if fill.placed_area() <= b.placed_area() => {}
                _ => best = Some((id, fill)),
            }
        }
        let complete = best.as_ref().is_some_and(|(_, f)| f.unplaced.is_empty());
        match &self.fallback {
            Some(fb) if !complete => {
                cancel.check()?;
                let fill = fb.fill(items, width, height, allow_rotation);
                debug!(strategy = %fb.id(), width, height, placed = fill.placements.len(), "fallback fill");
                if fill.unplaced.is_empty() {
                    best = Some((fb.id(), fill));
                }
            }
            _ => {}
        }
        Ok(best)
    }

    /// Runs `f` on every strategy and returns the outputs in registry order.
    fn run<T, F>(&self, cancel: &CancelToken, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&dyn PackingStrategy) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                cancel.check()?;
                return Ok(self.strategies.par_iter().map(|s| f(s.as_ref())).collect());
            }
        }
        #[cfg(not(feature = "parallel"))]
        let _ = self.parallel;

        let mut out = Vec::with_capacity(self.strategies.len());
        for s in &self.strategies {
            cancel.check()?;
            out.push(f(s.as_ref()));
        }
        Ok(out)
    }
}

/// Orders canvases by fill ratio using exact integer cross-multiplication.
fn compare_fill(a: &Canvas, b: &Canvas) -> Ordering {
    let lhs = a.used_area() as u128 * b.area() as u128;
    let rhs = b.used_area() as u128 * a.area() as u128;
    lhs.cmp(&rhs)
}
