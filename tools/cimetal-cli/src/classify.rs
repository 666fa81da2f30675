//! Kernel classification
//!
//! Splits discovered sources into one-file special groups (matched by exact
//! file name against the config table) and a default batch group holding
//! everything else.

use std::collections::HashMap;

use cimetal_shared::{
    stem_of, Diagnostic, DiagnosticSink, GroupId, KernelConfig, KernelGroup, SourceFile, Stage,
};

/// Partition `sources` into kernel groups.
///
/// Special groups come first, in config table order, followed by the default
/// group. Empty groups are never returned. When two sources share a special
/// file name the first in discovery order is claimed and the rest stay in the
/// default group.
pub fn classify(
    sources: &[SourceFile],
    config: &KernelConfig,
    diagnostics: &mut dyn DiagnosticSink,
) -> Vec<KernelGroup> {
    let mut claimed = vec![false; sources.len()];
    let mut groups = Vec::new();

    for special in &config.special {
        let mut matches = sources
            .iter()
            .enumerate()
            .filter(|(i, s)| !claimed[*i] && s.file_name == special.file);

        let Some((index, source)) = matches.next() else {
            diagnostics.emit(Diagnostic::remark(
                Stage::Classify,
                format!("{}: {} not found, no dedicated library", special.label, special.file),
            ));
            continue;
        };

        for (_, duplicate) in matches {
            diagnostics.emit(
                Diagnostic::warning(
                    Stage::Classify,
                    format!(
                        "Ambiguous special kernel {}: using {}, {} is compiled with the default group",
                        special.file,
                        source.path.display(),
                        duplicate.path.display()
                    ),
                )
                .with_path(&duplicate.path),
            );
        }

        claimed[index] = true;
        diagnostics.emit(
            Diagnostic::remark(
                Stage::Classify,
                format!("{}: {}", special.label, source.file_name),
            )
            .with_path(&source.path),
        );
        groups.push(KernelGroup {
            id: GroupId::Special(special.file.clone()),
            label: special.label.clone(),
            sources: vec![source.clone()],
            output_name: special.output.clone(),
            cache_name: special.cache.clone(),
        });
    }

    let remaining: Vec<SourceFile> = sources
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(s, _)| s.clone())
        .collect();

    if remaining.is_empty() {
        diagnostics.emit(Diagnostic::remark(
            Stage::Classify,
            "No remaining CI kernels to batch compile.",
        ));
    } else {
        diagnostics.emit(Diagnostic::remark(
            Stage::Classify,
            format!("{}: {} file(s)", config.default.label, remaining.len()),
        ));
        groups.push(KernelGroup {
            id: GroupId::Default,
            label: config.default.label.clone(),
            sources: remaining,
            output_name: config.default.output.clone(),
            cache_name: config.default.cache.clone(),
        });
    }

    for group in &groups {
        report_stem_collisions(group, diagnostics);
    }

    groups
}

/// Sources with equal stems would overwrite each other's cache files.
fn report_stem_collisions(group: &KernelGroup, diagnostics: &mut dyn DiagnosticSink) {
    let mut by_stem: HashMap<String, &SourceFile> = HashMap::new();
    for source in &group.sources {
        let stem = stem_of(&source.path);
        if let Some(first) = by_stem.get(&stem) {
            diagnostics.emit(
                Diagnostic::warning(
                    Stage::Classify,
                    format!(
                        "{} and {} share the base name '{}' in group {}; the compiler will reject this group",
                        first.path.display(),
                        source.path.display(),
                        stem,
                        group.id
                    ),
                )
                .with_path(&source.path),
            );
        } else {
            by_stem.insert(stem, source);
        }
    }
}
