//! Human and JSON renderings of gateway results

use std::fmt::Write;

use serde::Serialize;

use vellum_core::ArtifactFolder;
use vellum_gateway::{AccessDecision, ArtifactsBundle, SaveReceipt, Verdict};

pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn render_bundle(bundle: &ArtifactsBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Folder:   {}", bundle.folder.path());
    let _ = writeln!(out, "Table:    {} ({} bytes)", bundle.table.name, bundle.table.size);
    let _ = writeln!(out, "Loaded {}", bundle.table.shape);
    if bundle.versions.is_empty() {
        let _ = writeln!(out, "Versions: none");
    } else {
        let list: Vec<String> = bundle.versions.iter().map(|v| format!("v{v}")).collect();
        let _ = writeln!(out, "Versions: {}", list.join(", "));
    }
    for doc in &bundle.documents {
        let _ = writeln!(out, "Document: {} -> {}", doc.name, doc.link);
    }
    out
}

pub fn render_receipt(receipt: &SaveReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Saved {} as version {} ({} bytes)",
        receipt.artifact.name, receipt.artifact.version, receipt.artifact.size
    );
    let _ = writeln!(out, "Folder:   {}", receipt.artifact.folder);
    let _ = writeln!(out, "By:       {}", receipt.principal);
    let _ = writeln!(out, "At:       {}", receipt.saved_at.to_rfc3339());
    match &receipt.link {
        Some(link) => {
            let _ = writeln!(out, "Link:     {link}");
        }
        None => {
            let _ = writeln!(out, "Link:     unavailable");
        }
    }
    let _ = writeln!(out, "Request:  {}", receipt.request_id);
    out
}

pub fn render_decision(decision: &AccessDecision) -> String {
    let generation = decision.snapshot.generation;
    match decision.verdict {
        Verdict::Allow => format!(
            "{}: allowed (allowlist generation {generation})\n",
            decision.principal
        ),
        Verdict::Deny(reason) => format!(
            "{}: denied, {reason} (allowlist generation {generation})\n",
            decision.principal
        ),
    }
}

pub fn render_folder(folder: &ArtifactFolder) -> String {
    format!("{}\n", folder.path())
}
