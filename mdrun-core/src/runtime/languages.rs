//! The language table.
//!
//! One table keyed by normalized tag. Each entry names the strategy the tag
//! implies. Built-in entries are inserted in precedence order (shell family,
//! then interpreters, then file-based, then database queries) so a tag listed
//! in more than one family keeps the first one. User overrides from settings
//! replace built-in entries outright.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// How a block's text reaches the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Join surviving lines with `&&` and send directly.
    Shell,
    /// Wrap the whole body in double quotes behind a one-liner launcher
    /// such as `python3 -c`.
    Interpreter { command: String },
    /// Needs a file on disk first; never sent, the user gets guidance.
    #[serde(rename = "file")]
    FileBased { extension: String, runner: String },
    /// Database query; copied to the clipboard, never executed.
    Query,
    /// Not in the table and not allow-listed.
    #[serde(skip)]
    Unsupported,
}

/// Result of classifying a fence tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// True iff the normalized tag matches an allow-list entry.
    pub is_runnable: bool,
    pub strategy: ExecutionStrategy,
}

const SHELL_FAMILY: &[&str] = &[
    // Shell variants
    "bash", "sh", "shell", "zsh", "console", "terminal", "powershell", "ps1", "cmd", "batch",
    "fish", "tcsh", "csh", "ksh", "ash", "dash",
    // Git
    "git", "git-bash", "gitbash",
    // Containers
    "docker", "docker-compose", "dockerfile", "containerfile",
    // Cloud / orchestration
    "kubectl", "helm", "terraform", "ansible", "vagrant",
    // Package managers / build tools
    "npm", "yarn", "pnpm", "pip", "pipenv", "poetry", "cargo", "gem", "bundler", "make",
    "makefile", "cmake", "gradle", "maven", "ant", "bazel", "meson", "ninja",
    // Network tools
    "curl", "wget", "http", "httpie", "ssh", "scp", "rsync", "ftp", "sftp",
    // Text processing
    "awk", "sed", "grep", "jq", "yq", "xargs",
    // System admin
    "systemd", "service", "cron", "crontab", "nginx", "apache", "caddy",
    // Plain text
    "text", "txt", "plain", "plaintext", "raw",
    // No language
    "",
];

const INTERPRETERS: &[(&str, &str)] = &[
    ("python", "python3 -c"),
    ("py", "python3 -c"),
    ("python3", "python3 -c"),
    ("javascript", "node -e"),
    ("js", "node -e"),
    ("node", "node -e"),
    ("typescript", "npx ts-node -e"),
    ("ts", "npx ts-node -e"),
    ("ruby", "ruby -e"),
    ("rb", "ruby -e"),
    ("perl", "perl -e"),
    ("php", "php -r"),
    ("lua", "lua -e"),
    ("r", "Rscript -e"),
];

const FILE_BASED: &[(&str, &str, &str)] = &[
    ("go", ".go", "go run"),
    ("rust", ".rs", "rustc -o /tmp/rust_temp && /tmp/rust_temp"),
    ("java", ".java", "java"),
    ("kotlin", ".kt", "kotlin"),
    ("scala", ".scala", "scala"),
    ("swift", ".swift", "swift"),
    ("c", ".c", "gcc -o /tmp/c_temp && /tmp/c_temp"),
    ("cpp", ".cpp", "g++ -o /tmp/cpp_temp && /tmp/cpp_temp"),
    ("csharp", ".cs", "dotnet script"),
    ("cs", ".cs", "dotnet script"),
];

const QUERY_LANGUAGES: &[&str] = &["sql", "mysql", "postgresql", "sqlite"];

/// Lowercase + trim. The only normalization tags ever get.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Case-insensitive allow-list check. The empty entry matches plain fences.
pub fn is_allowed(tag: &str, allow_list: &[String]) -> bool {
    let normalized = normalize_tag(tag);
    allow_list
        .iter()
        .any(|entry| normalize_tag(entry) == normalized)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable {
    entries: HashMap<String, ExecutionStrategy>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LanguageTable {
    /// The hand-maintained defaults.
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();

        for tag in SHELL_FAMILY {
            entries
                .entry(tag.to_string())
                .or_insert(ExecutionStrategy::Shell);
        }
        for (tag, command) in INTERPRETERS {
            entries
                .entry(tag.to_string())
                .or_insert_with(|| ExecutionStrategy::Interpreter {
                    command: command.to_string(),
                });
        }
        for (tag, extension, runner) in FILE_BASED {
            entries
                .entry(tag.to_string())
                .or_insert_with(|| ExecutionStrategy::FileBased {
                    extension: extension.to_string(),
                    runner: runner.to_string(),
                });
        }
        for tag in QUERY_LANGUAGES {
            entries
                .entry(tag.to_string())
                .or_insert(ExecutionStrategy::Query);
        }

        Self { entries }
    }

    /// Built-ins with user overrides applied on top.
    pub fn with_overrides(overrides: &BTreeMap<String, ExecutionStrategy>) -> Self {
        let mut table = Self::builtin();
        for (tag, strategy) in overrides {
            if *strategy == ExecutionStrategy::Unsupported {
                continue;
            }
            table.entries.insert(normalize_tag(tag), strategy.clone());
        }
        table
    }

    /// Raw table lookup, no allow-list fallback.
    pub fn lookup(&self, tag: &str) -> Option<&ExecutionStrategy> {
        self.entries.get(&normalize_tag(tag))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classify `tag` against this table and an allow-list.
    ///
    /// Strategy lookup does not depend on `is_runnable`; a tag missing from
    /// the table falls back to `Shell` only when it is allow-listed.
    pub fn classify(&self, tag: &str, allow_list: &[String]) -> Classification {
        let is_runnable = is_allowed(tag, allow_list);
        let strategy = match self.lookup(tag) {
            Some(strategy) => strategy.clone(),
            None if is_runnable => ExecutionStrategy::Shell,
            None => ExecutionStrategy::Unsupported,
        };
        Classification {
            is_runnable,
            strategy,
        }
    }
}

static BUILTIN: OnceLock<LanguageTable> = OnceLock::new();

/// Classify against the built-in table.
pub fn classify(tag: &str, allow_list: &[String]) -> Classification {
    BUILTIN
        .get_or_init(LanguageTable::builtin)
        .classify(tag, allow_list)
}
