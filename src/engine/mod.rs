//! Run Controller
//!
//! Drives the arity loop: the unary pass first, then candidate
//! generation, n-ary validation, and augmentation-rule extraction per
//! arity until no candidate survives or the configured arity cap is hit.
//! Between passes the controller is strictly sequential; inside a pass the
//! substrate parallelises freely.
//!
//! The controller owns the cumulative IND set. After every n-ary pass the
//! candidate generator consolidates it: INDs implied by a newly validated,
//! strictly more specific IND are dropped, so the final set is maximal.
//!
//! Cancellation is cooperative and checked at pass boundaries. The
//! streaming collector is registered for the whole run through a scoped
//! guard, so its shutdown hook runs on every exit path, including panic.

pub mod collect;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::error::{DiscoveryError, Result};
use crate::generator::augmentation::{self, AugmentationRule};
use crate::generator::CandidateGenerator;
use crate::input::{InputCatalog, InputTable, NameTable};
use crate::model::column::ColumnCodec;
use crate::model::ind::Ind;
use crate::pipeline::nary::run_nary;
use crate::pipeline::unary::run_unary;
use crate::pipeline::Delivery;
use crate::substrate::Substrate;
use collect::IndCollector;

/// One arity pass, as reported in the run summary.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub arity: usize,
    /// Columns considered (arity 1) or candidates generated (arity >= 2).
    pub considered: usize,
    /// INDs validated by the pass, before rule extraction.
    pub validated: usize,
    /// Augmentation rules extracted from the pass.
    pub rules_emitted: usize,
    pub elapsed: Duration,
}

/// What a completed run did, pass by pass.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub passes: Vec<PassSummary>,
    /// Set instead of the IND list when `only_count_inds` is configured.
    pub unary_ind_count: Option<u64>,
}

impl RunSummary {
    pub fn total_elapsed(&self) -> Duration {
        self.passes.iter().map(|p| p.elapsed).sum()
    }
}

/// A completed run: the maximal IND set, the augmentation rules, and the
/// name table for rendering.
#[derive(Debug)]
pub struct RunOutcome {
    pub inds: Vec<Ind>,
    pub rules: Vec<AugmentationRule>,
    pub summary: RunSummary,
    pub names: NameTable,
}

/// The discovery engine: settings, inputs and a substrate.
pub struct Discovery<S: Substrate> {
    settings: Settings,
    tables: Vec<Box<dyn InputTable>>,
    substrate: S,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: Substrate> Discovery<S> {
    pub fn new(settings: Settings, tables: Vec<Box<dyn InputTable>>, substrate: S) -> Self {
        Discovery {
            settings,
            tables,
            substrate,
            cancel: None,
        }
    }

    /// Attach a cooperative cancellation flag, checked at pass boundaries.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Execute the full run, streaming every freshly validated IND to
    /// `collector` as it surfaces.
    pub fn run(&self, collector: Arc<dyn IndCollector>) -> Result<RunOutcome> {
        self.settings.validate()?;
        let codec = ColumnCodec::new(self.settings.num_column_bits)?;
        let catalog = InputCatalog::bind(codec, &self.tables, self.settings.max_columns_cap())?;
        let names = catalog.name_table();

        // Scoped registration: released on every exit path below.
        let guard = collect::register(collector);
        let delivery = Delivery {
            token: guard.token(),
        };
        let pass_config = self.settings.pass_config();
        let mut summary = RunSummary::default();

        // Arity 1.
        self.check_cancelled()?;
        let started = Instant::now();
        let outcome = run_unary(
            &self.substrate,
            &self.tables,
            &catalog,
            pass_config,
            delivery,
        )?;
        let unary_elapsed = started.elapsed();
        let unary_count = outcome.inds.len();
        tracing::info!(
            arity = 1,
            columns = catalog.universe().len(),
            validated = unary_count,
            elapsed_ms = unary_elapsed.as_millis() as u64,
            "unary pass complete"
        );

        if self.settings.only_count_inds {
            summary.passes.push(PassSummary {
                arity: 1,
                considered: catalog.universe().len(),
                validated: unary_count,
                rules_emitted: 0,
                elapsed: unary_elapsed,
            });
            summary.unary_ind_count = Some(unary_count as u64);
            return Ok(RunOutcome {
                inds: Vec::new(),
                rules: Vec::new(),
                summary,
                names,
            });
        }

        let mut stats = outcome.stats;
        let mut rules = augmentation::void_column_rules(&stats, catalog.codec())?;
        let extraction = augmentation::extract_rules(outcome.inds, &stats)?;
        rules.extend(extraction.rules);
        summary.passes.push(PassSummary {
            arity: 1,
            considered: catalog.universe().len(),
            validated: unary_count,
            rules_emitted: rules.len(),
            elapsed: unary_elapsed,
        });

        let mut new_inds = extraction.kept;
        let mut all_inds = new_inds.clone();

        if self.settings.max_arity_cap() != Some(1) {
            let generator = self.generator()?;
            let mut arity = 2;
            loop {
                if let Some(cap) = self.settings.max_arity_cap() {
                    if arity > cap {
                        break;
                    }
                }
                if new_inds.is_empty() {
                    break;
                }
                self.check_cancelled()?;

                let started = Instant::now();
                let candidates = generator.generate(&new_inds, &stats)?;
                tracing::debug!(arity, candidates = candidates.len(), "candidates generated");
                if candidates.is_empty() {
                    break;
                }

                let chunk_size = self
                    .settings
                    .candidate_chunk_size
                    .unwrap_or(candidates.len());
                let mut validated = Vec::new();
                for chunk in candidates.chunks(chunk_size) {
                    tracing::debug!(arity, chunk = chunk.len(), "validating candidate chunk");
                    let outcome = run_nary(
                        &self.substrate,
                        &self.tables,
                        &catalog,
                        pass_config,
                        chunk,
                        delivery,
                    )?;
                    stats.merge(outcome.stats);
                    validated.extend(outcome.inds);
                }

                let validated_count = validated.len();
                let extraction = augmentation::extract_rules(validated, &stats)?;
                let rules_emitted = extraction.rules.len();
                rules.extend(extraction.rules);
                generator.consolidate(&mut all_inds, extraction.kept.clone());
                new_inds = extraction.kept;

                let elapsed = started.elapsed();
                tracing::info!(
                    arity,
                    candidates = candidates.len(),
                    validated = validated_count,
                    rules = rules_emitted,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "n-ary pass complete"
                );
                summary.passes.push(PassSummary {
                    arity,
                    considered: candidates.len(),
                    validated: validated_count,
                    rules_emitted,
                    elapsed,
                });
                arity += 1;
            }
        }

        all_inds.sort_unstable();
        // The void-column enumeration and the per-IND extraction can both
        // derive the same rule; keep one copy.
        let mut seen = HashSet::new();
        rules.retain(|rule| seen.insert(rule.clone()));
        Ok(RunOutcome {
            inds: all_inds,
            rules,
            summary,
            names,
        })
    }

    fn generator(&self) -> Result<CandidateGenerator> {
        let kind = self.settings.candidate_generator.ok_or_else(|| {
            DiscoveryError::Configuration("candidate_generator is not configured".to_string())
        })?;
        let restriction = self.settings.nary_restriction.ok_or_else(|| {
            DiscoveryError::Configuration("nary_restriction is not configured".to_string())
        })?;
        Ok(CandidateGenerator::new(
            kind,
            restriction,
            self.settings.exclude_void_inds_from_candidate_generation,
        ))
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(DiscoveryError::Cancelled);
            }
        }
        Ok(())
    }
}
