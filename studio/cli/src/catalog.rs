//! Frameworks and models the terminal surface knows about
//!
//! The core treats both as opaque strings. This module gives them names on
//! the command line and decides where each framework's artifact is written.

use clap::ValueEnum;

/// Target frameworks selectable with `--framework`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Framework {
    /// React single-file component
    React,
    /// Vue single-file component
    Vue,
    /// Angular root component
    Angular,
    /// Svelte component
    Svelte,
    /// Next.js page
    Nextjs,
    /// Plain HTML page
    Static,
}

impl Framework {
    /// Identifier sent to the backend
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Vue => "vue",
            Self::Angular => "angular",
            Self::Svelte => "svelte",
            Self::Nextjs => "nextjs",
            Self::Static => "static",
        }
    }
}

/// Relative path the artifact for `framework` is written to
///
/// Unknown frameworks are treated as static HTML.
#[must_use]
pub fn artifact_path(framework: &str) -> &'static str {
    match framework {
        "react" => "App.tsx",
        "vue" => "src/App.vue",
        "angular" => "src/app/app.component.ts",
        "svelte" => "App.svelte",
        "nextjs" => "pages/index.js",
        _ => "index.html",
    }
}

/// A model offered by the generation backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelChoice {
    /// Short name accepted by `--model`
    pub key: &'static str,
    /// Display name
    pub label: &'static str,
    /// Backend model identifier
    pub id: &'static str,
}

/// Known models, default first
pub const MODELS: &[ModelChoice] = &[
    ModelChoice {
        key: "dobby",
        label: "Dobby Unhinged",
        id: "accounts/sentientfoundation/models/dobby-unhinged-llama-3-3-70b-new",
    },
    ModelChoice {
        key: "llama-405b",
        label: "Llama 3.1 405B",
        id: "accounts/fireworks/models/llama-v3p1-405b-instruct",
    },
];

/// Resolve a `--model` value: a catalogue key, or a raw model identifier
#[must_use]
pub fn resolve_model(value: &str) -> String {
    MODELS
        .iter()
        .find(|m| m.key.eq_ignore_ascii_case(value))
        .map_or_else(|| value.to_string(), |m| m.id.to_string())
}

/// Display name for a model identifier, if it is in the catalogue
#[must_use]
pub fn model_label(id: &str) -> Option<&'static str> {
    MODELS.iter().find(|m| m.id == id).map(|m| m.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        assert_eq!(artifact_path(Framework::React.as_str()), "App.tsx");
        assert_eq!(artifact_path(Framework::Vue.as_str()), "src/App.vue");
        assert_eq!(
            artifact_path(Framework::Angular.as_str()),
            "src/app/app.component.ts"
        );
        assert_eq!(artifact_path(Framework::Svelte.as_str()), "App.svelte");
        assert_eq!(artifact_path(Framework::Nextjs.as_str()), "pages/index.js");
        assert_eq!(artifact_path(Framework::Static.as_str()), "index.html");
        assert_eq!(artifact_path("solid"), "index.html");
    }

    #[test]
    fn test_resolve_model() {
        assert_eq!(resolve_model("dobby"), MODELS[0].id);
        assert_eq!(resolve_model("LLAMA-405B"), MODELS[1].id);
        assert_eq!(resolve_model("accounts/x/models/y"), "accounts/x/models/y");
    }

    #[test]
    fn test_default_model_matches_core() {
        assert_eq!(MODELS[0].id, appstudio_core::config::DEFAULT_MODEL);
        assert_eq!(model_label(MODELS[0].id), Some("Dobby Unhinged"));
        assert_eq!(model_label("unknown"), None);
    }
}
