use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fhir::{Questionnaire, QuestionnaireResource, QuestionnaireResponse, ResponseResource};
use repop_core::config::enable_when_activated_from_env_value;
use repop_core::constants::ENABLE_WHEN_ENV_VAR;
use repop_core::review::{detect_changes, group_by_section};
use repop_core::{
    EnableWhenState, InMemoryFormStore, ItemsToRepopulate, RepopulateConfig, RepopulationService,
    Tabs,
};
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "repop")]
#[command(about = "Questionnaire response repopulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the repopulation change-set as JSON
    Diff(DiffInputs),
    /// Print the change-set grouped by section
    Review(DiffInputs),
    /// Merge approved candidates into the current response
    Merge {
        /// Questionnaire (JSON or YAML)
        #[arg(long)]
        questionnaire: PathBuf,
        /// Response currently being edited
        #[arg(long)]
        current: PathBuf,
        /// Change-set produced by `repop diff`
        #[arg(long)]
        candidates: PathBuf,
        /// Approved linkIds (comma-separated); all candidates when omitted
        #[arg(long, value_delimiter = ',')]
        approve: Option<Vec<String>>,
    },
}

#[derive(Args)]
struct DiffInputs {
    /// Questionnaire (JSON or YAML)
    #[arg(long)]
    questionnaire: PathBuf,
    /// Freshly server-populated response
    #[arg(long)]
    server: PathBuf,
    /// Response currently being edited
    #[arg(long)]
    current: PathBuf,
    /// enableWhen evaluation results (`{"items": {...}, "expressions": {...}}`)
    #[arg(long)]
    enable_when: Option<PathBuf>,
    /// Tab metadata (`{"<linkId>": {"isComplete": false, "isHidden": false}}`)
    #[arg(long)]
    tabs: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("repop=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(RepopulateConfig::new(enable_when_activated_from_env_value(
        std::env::var(ENABLE_WHEN_ENV_VAR).ok(),
    )?));

    match cli.command {
        Some(Commands::Diff(inputs)) => {
            let candidates = run_diff(&inputs, cfg)?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        Some(Commands::Review(inputs)) => {
            let candidates = run_diff(&inputs, cfg)?;
            print!("{}", render_review(&candidates)?);
        }
        Some(Commands::Merge {
            questionnaire,
            current,
            candidates,
            approve,
        }) => {
            let merged = run_merge(&questionnaire, &current, &candidates, approve, cfg)?;
            println!("{}", ResponseResource::render_json(&merged)?);
        }
        None => {
            println!("Use 'repop --help' for commands");
        }
    }

    Ok(())
}

fn run_diff(inputs: &DiffInputs, cfg: Arc<RepopulateConfig>) -> anyhow::Result<ItemsToRepopulate> {
    let questionnaire = load_questionnaire(&inputs.questionnaire)?;
    let server = load_response(&inputs.server)?;
    let current = load_response(&inputs.current)?;
    let tabs: Tabs = match &inputs.tabs {
        Some(path) => load_document(path)?,
        None => Tabs::new(),
    };

    let store = InMemoryFormStore::new(current);
    if let Some(path) = &inputs.enable_when {
        store.set_enable_when(load_document::<EnableWhenState>(path)?);
    }

    let service = RepopulationService::new(cfg, Arc::new(questionnaire), Arc::new(tabs));
    Ok(service.compute(&server, &store))
}

fn run_merge(
    questionnaire: &Path,
    current: &Path,
    candidates: &Path,
    approve: Option<Vec<String>>,
    cfg: Arc<RepopulateConfig>,
) -> anyhow::Result<QuestionnaireResponse> {
    let questionnaire = load_questionnaire(questionnaire)?;
    let store = InMemoryFormStore::new(load_response(current)?);

    let mut candidates: ItemsToRepopulate = load_document(candidates)?;
    candidates.resolve_definitions(&questionnaire);
    let approved = match approve {
        Some(link_ids) => candidates.select(link_ids),
        None => candidates,
    };

    let service = RepopulationService::new(cfg, Arc::new(questionnaire), Arc::new(Tabs::new()));
    Ok(service.apply(&approved, &store, &store)?)
}

/// Human-readable review listing, one block per section.
fn render_review(candidates: &ItemsToRepopulate) -> Result<String, std::fmt::Error> {
    if candidates.is_empty() {
        return Ok("Nothing to repopulate.\n".to_string());
    }

    let mut out = String::new();
    for (heading, entries) in group_by_section(candidates) {
        let heading = if heading.is_empty() { "(no section)" } else { heading.as_str() };
        writeln!(out, "== {heading}")?;

        for (link_id, candidate) in entries {
            match &candidate.parent_item_text {
                Some(parent) => writeln!(out, "- {link_id} ({parent})")?,
                None => writeln!(out, "- {link_id}")?,
            }

            for change in detect_changes(candidate) {
                let row = change
                    .row_label
                    .as_deref()
                    .map(|label| format!("[{label}] "))
                    .unwrap_or_default();
                let field = if change.field_label == change.item_text {
                    change.item_text.clone()
                } else {
                    format!("{} / {}", change.field_label, change.item_text)
                };
                writeln!(
                    out,
                    "    {row}{field}: {} -> {}",
                    change.current_value.as_deref().unwrap_or("(none)"),
                    change.server_value.as_deref().unwrap_or("(none)"),
                )?;
            }
        }
    }
    Ok(out)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    tracing::debug!(path = %path.display(), "reading input");
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_questionnaire(path: &Path) -> anyhow::Result<Questionnaire> {
    let text = read_text(path)?;
    let parsed = if is_yaml(path) {
        QuestionnaireResource::parse_yaml(&text)
    } else {
        QuestionnaireResource::parse_json(&text)
    };
    parsed.with_context(|| format!("failed to parse questionnaire {}", path.display()))
}

fn load_response(path: &Path) -> anyhow::Result<QuestionnaireResponse> {
    let text = read_text(path)?;
    let parsed = if is_yaml(path) {
        ResponseResource::parse_yaml(&text)
    } else {
        ResponseResource::parse_json(&text)
    };
    parsed.with_context(|| format!("failed to parse response {}", path.display()))
}

/// Load a plain JSON/YAML document (enableWhen state, tabs, change-sets).
fn load_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = read_text(path)?;
    if is_yaml(path) {
        serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    } else {
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn write_json(dir: &TempDir, name: &str, value: Value) -> PathBuf {
        write(dir, name, &value.to_string())
    }

    fn qr(items: Value) -> Value {
        json!({ "resourceType": "QuestionnaireResponse", "status": "in-progress", "item": items })
    }

    fn answer(link_id: &str, value: &str) -> Value {
        json!({ "linkId": link_id, "answer": [{ "valueString": value }] })
    }

    struct Fixture {
        _dir: TempDir,
        inputs: DiffInputs,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let questionnaire = write(
            &dir,
            "questionnaire.yaml",
            r#"resourceType: Questionnaire
item:
  - linkId: about
    type: group
    text: About
    item:
      - linkId: name
        type: string
        text: Name
      - linkId: smoker
        type: boolean
        text: Smoker
"#,
        );
        let server = write_json(
            &dir,
            "server.json",
            qr(json!([{ "linkId": "about", "item": [
                answer("name", "Jo Bloggs"),
                { "linkId": "smoker", "answer": [{ "valueBoolean": true }] }
            ] }])),
        );
        let current = write_json(
            &dir,
            "current.json",
            qr(json!([{ "linkId": "about", "item": [
                answer("name", "Jo"),
                { "linkId": "smoker", "answer": [{ "valueBoolean": false }] }
            ] }])),
        );
        let enable_when =
            write_json(&dir, "enable-when.json", json!({ "items": { "smoker": false } }));

        Fixture {
            inputs: DiffInputs {
                questionnaire,
                server,
                current,
                enable_when: Some(enable_when),
                tabs: None,
            },
            _dir: dir,
        }
    }

    #[test]
    fn yaml_detection_uses_extension() {
        assert!(is_yaml(Path::new("q.yaml")));
        assert!(is_yaml(Path::new("dir/q.yml")));
        assert!(!is_yaml(Path::new("q.json")));
        assert!(!is_yaml(Path::new("q")));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_response(Path::new("/definitely/not/here.json")).expect_err("missing file");
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }

    #[test]
    fn wrong_resource_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_json(&dir, "q.json", json!({ "resourceType": "QuestionnaireResponse" }));
        let err = load_questionnaire(&path).expect_err("wrong resource type");
        assert!(format!("{err:#}").contains("expected resourceType Questionnaire"));
    }

    #[test]
    fn diff_respects_enable_when_file() {
        let fixture = fixture();
        let candidates =
            run_diff(&fixture.inputs, Arc::new(RepopulateConfig::default())).expect("diff");
        let ids: Vec<&str> = candidates.link_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["name"]);

        let everything =
            run_diff(&fixture.inputs, Arc::new(RepopulateConfig::new(false))).expect("diff");
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn review_lists_changes_under_sections() {
        let fixture = fixture();
        let candidates =
            run_diff(&fixture.inputs, Arc::new(RepopulateConfig::default())).expect("diff");

        let review = render_review(&candidates).expect("render review");
        assert_eq!(review, "== About\n- name (About)\n    Name: Jo -> Jo Bloggs\n");
        let empty = render_review(&ItemsToRepopulate::new()).expect("render review");
        assert_eq!(empty, "Nothing to repopulate.\n");
    }

    #[test]
    fn merge_applies_saved_change_set() {
        let fixture = fixture();
        let cfg = Arc::new(RepopulateConfig::new(false));
        let candidates = run_diff(&fixture.inputs, Arc::clone(&cfg)).expect("diff");

        // Saved change-sets drop qItem; merge must resolve definitions again.
        let mut saved = serde_json::to_value(&candidates).expect("render candidates");
        for candidate in saved.as_object_mut().expect("object").values_mut() {
            candidate["qItem"] = Value::Null;
        }
        let saved_path = write_json(&fixture._dir, "candidates.json", saved);

        let merged = run_merge(
            &fixture.inputs.questionnaire,
            &fixture.inputs.current,
            &saved_path,
            Some(vec!["smoker".to_string()]),
            cfg,
        )
        .expect("merge");

        let rendered = serde_json::to_value(&merged).expect("render merged");
        assert_eq!(
            rendered["item"][0]["item"],
            json!([
                answer("name", "Jo"),
                { "linkId": "smoker", "answer": [{ "valueBoolean": true }] }
            ])
        );
    }
}
