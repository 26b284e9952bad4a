//! Reload controller: file contents to a swapped-in pipeline.

use std::path::{Path, PathBuf};

use crate::error::ReloadError;
use crate::params::{Declaration, VariableRegistry};
use crate::pipeline::{Pipeline, RenderBackend, Stage};
use crate::preprocess::{parse_tokens, split_stages, CompileUnit, ParsedStage, MAX_STAGES};

#[derive(Debug)]
pub enum ReloadOutcome {
    /// Every stage compiled and was swapped in.
    Applied { stages: usize },
    /// A later stage failed; the stages before it were swapped in.
    Partial { kept: usize, error: ReloadError },
    /// Nothing was swapped; the previous pipeline stays active.
    Rejected(ReloadError),
}

impl ReloadOutcome {
    pub fn error(&self) -> Option<&ReloadError> {
        match self {
            ReloadOutcome::Applied { .. } => None,
            ReloadOutcome::Partial { error, .. } | ReloadOutcome::Rejected(error) => Some(error),
        }
    }
}

pub struct ReloadController {
    path: PathBuf,
    stage_limit: usize,
    prune_unreferenced: bool,
}

impl ReloadController {
    pub fn new(path: impl Into<PathBuf>, stage_limit: usize, prune_unreferenced: bool) -> Self {
        Self {
            path: path.into(),
            stage_limit: stage_limit.clamp(1, MAX_STAGES),
            prune_unreferenced,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and rebuild the pipeline from scratch.
    pub fn reload<B: RenderBackend>(
        &self,
        backend: &mut B,
        pipeline: &mut Pipeline<B>,
        registry: &mut VariableRegistry,
    ) -> ReloadOutcome {
        log::info!("loading shader {}...", self.path.display());
        let outcome = match std::fs::read_to_string(&self.path) {
            Ok(content) => self.apply_source(&content, backend, pipeline, registry),
            Err(source) => ReloadOutcome::Rejected(ReloadError::FileUnavailable {
                path: self.path.clone(),
                source,
            }),
        };
        report(&outcome, pipeline.active_stage_count());
        outcome
    }

    /// Parse, merge, build and compile `content`, then swap the result in.
    pub fn apply_source<B: RenderBackend>(
        &self,
        content: &str,
        backend: &mut B,
        pipeline: &mut Pipeline<B>,
        registry: &mut VariableRegistry,
    ) -> ReloadOutcome {
        let units = match prepare(content, registry, self.stage_limit) {
            Ok(units) => units,
            Err(e) => return ReloadOutcome::Rejected(e),
        };
        if units.is_empty() {
            log::warn!("{} contains no stages", self.path.display());
        }

        let mut stages = Vec::with_capacity(units.len());
        let mut failure = None;
        for unit in &units {
            match backend.compile(unit) {
                Ok(program) => stages.push(Stage {
                    program,
                    parameters: unit.parameters.clone(),
                    referenced: unit.referenced.clone(),
                }),
                Err(messages) => {
                    let diagnostics = unit.remap(&messages);
                    for d in &diagnostics {
                        match unit.file_line(d) {
                            Some(n) => log::error!(
                                "stage {} line {} ({}:{n}): {}",
                                unit.stage,
                                d.line,
                                self.path.display(),
                                d.text
                            ),
                            None => log::error!("stage {}: {}", unit.stage, d.text),
                        }
                    }
                    failure = Some(ReloadError::StageCompile {
                        stage: unit.stage,
                        diagnostics,
                    });
                    break;
                }
            }
        }

        match failure {
            None => {
                let count = stages.len();
                pipeline.replace_stages(stages);
                if self.prune_unreferenced {
                    let removed = registry.prune_unreferenced(&pipeline.referenced_parameters());
                    if removed > 0 {
                        log::info!("Pruned {removed} unreferenced parameter(s)");
                    }
                }
                ReloadOutcome::Applied { stages: count }
            }
            Some(error) if stages.is_empty() => ReloadOutcome::Rejected(error),
            Some(error) => {
                let kept = stages.len();
                pipeline.replace_stages(stages);
                ReloadOutcome::Partial { kept, error }
            }
        }
    }
}

/// Split, parse every stage, merge all declarations, then build one compile
/// unit per stage against the merged registry.
///
/// Parsing finishes for all stages before the registry is touched, so a
/// token error leaves the registry exactly as it was.
pub fn prepare(
    content: &str,
    registry: &mut VariableRegistry,
    stage_limit: usize,
) -> Result<Vec<CompileUnit>, ReloadError> {
    let blocks = split_stages(content, stage_limit);
    let parsed = blocks
        .iter()
        .map(|b| {
            parse_tokens(&b.source).map_err(|error| ReloadError::TokenSyntax {
                stage: b.index,
                error,
            })
        })
        .collect::<Result<Vec<ParsedStage>, _>>()?;

    registry.merge(&fold_declarations(&parsed));

    Ok(blocks
        .iter()
        .zip(&parsed)
        .map(|(b, p)| CompileUnit::new(b, p, registry))
        .collect())
}

/// Collapse every sighting of a name across all stages into one declaration.
///
/// The first sighting with explicit bounds decides bounds and initial value.
/// Merging a name once per reload keeps a conflicting later redeclaration
/// from resetting the value on every save.
fn fold_declarations(parsed: &[ParsedStage]) -> Vec<Declaration> {
    let mut folded: Vec<Declaration> = Vec::new();
    for decl in parsed.iter().flat_map(|p| &p.declarations) {
        let Some(existing) = folded.iter_mut().find(|d| d.name == decl.name) else {
            folded.push(decl.clone());
            continue;
        };
        match (existing.bounds, decl.bounds) {
            (None, Some(_)) => {
                existing.bounds = decl.bounds;
                existing.initial = decl.initial;
            }
            (Some(kept), Some(other)) if kept != other => log::warn!(
                "'{}' declared with bounds [{}, {}] and [{}, {}]; using the first",
                decl.name,
                kept.min,
                kept.max,
                other.min,
                other.max
            ),
            _ => {}
        }
    }
    folded
}

fn report(outcome: &ReloadOutcome, active: usize) {
    match outcome {
        ReloadOutcome::Applied { stages } => log::info!("done. ({stages} stage(s))"),
        ReloadOutcome::Partial { kept, error } => {
            log::error!("{error}; running with {kept} stage(s)");
        }
        ReloadOutcome::Rejected(error) => {
            log::error!("{error}; keeping previous pipeline ({active} stage(s))");
        }
    }
}
