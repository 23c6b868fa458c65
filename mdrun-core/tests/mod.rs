use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use mdrun_core::airlock::{
    authorize, preview_line, summarize_command, Authorization, SessionCapability, ELLIPSIS,
};
use mdrun_core::blocks::parser::{language_from_info, line_separator};
use mdrun_core::channel::{
    build_request_uri, decode_query, decode_request, decode_uri, parse_action,
    parse_query_pairs, percent_decode_strict, request_action, split_uri,
};
use mdrun_core::error::RequestError;
use mdrun_core::lens::{code_lenses, LENS_TITLE};
use mdrun_core::render::{annotate_fence, render_document, render_fence_default};
use mdrun_core::runner::{escape_double_quoted, interpreter_command, join_shell, normalize_lines};
use mdrun_core::runtime::languages::LanguageTable;
use mdrun_core::settings::{default_supported_languages, Settings};
use mdrun_core::{classify, parse_code_blocks, ExecutionStrategy, RunAction};

use std::collections::BTreeMap;

fn langs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Block Parser Tests
// ============================================================================

#[test]
fn test_parse_blocks_in_document_order() {
    let doc = "# Title\n\n```bash\nls\n```\n\ntext\n\n```python\nprint(1)\n```\n\n```\nplain\n```\n";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0].language, "bash");
    assert_eq!(blocks[0].content, "ls");
    assert_eq!(blocks[1].language, "python");
    assert_eq!(blocks[1].content, "print(1)");
    assert_eq!(blocks[2].language, "");
    assert_eq!(blocks[2].content, "plain");
}

#[test]
fn test_parse_unterminated_trailing_fence_is_dropped() {
    let doc = "```sh\necho one\n```\n\n```sh\necho two\n";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].content, "echo one");
}

#[test]
fn test_parse_only_unterminated_fence_yields_nothing() {
    assert!(parse_code_blocks("```bash\necho hi").is_empty());
}

#[test]
fn test_parse_keeps_blank_lines_verbatim() {
    let doc = "```bash\necho 1\n\n  indented\n```";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks[0].content, "echo 1\n\n  indented");
}

#[test]
fn test_parse_crlf_document_joins_with_crlf() {
    let doc = "```bash\r\necho 1\r\necho 2\r\n```\r\n";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].content, "echo 1\r\necho 2");
    assert_eq!(line_separator(doc), "\r\n");
}

#[test]
fn test_line_separator_follows_dominant_ending() {
    assert_eq!(line_separator("a\nb\nc\n"), "\n");
    assert_eq!(line_separator("a\r\nb\r\nc\n"), "\r\n");
}

#[test]
fn test_parse_info_string_preserved_language_normalized() {
    let doc = "```Bash title=\"setup\"\necho hi\n```\n";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks[0].info, "Bash title=\"setup\"");
    assert_eq!(blocks[0].language, "bash");
}

#[test]
fn test_parse_longer_fence_markers() {
    let doc = "````bash\necho hi\n````\n";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].content, "echo hi");
}

#[test]
fn test_parse_nested_fence_closes_outer_block() {
    // Not length aware: the inner bare fence closes the outer block.
    let doc = "````markdown\n```bash\nls\n```\n````\n";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks[0].language, "markdown");
    assert_eq!(blocks[0].content, "```bash\nls");
}

#[test]
fn test_parse_fence_with_info_does_not_close() {
    let doc = "```bash\n```python\n```\n";
    let blocks = parse_code_blocks(doc);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].content, "```python");
}

#[test]
fn test_parse_indented_close_fence() {
    let doc = "```bash\necho hi\n   ```\n";
    assert_eq!(parse_code_blocks(doc).len(), 1);
}

#[test]
fn test_parse_offsets_and_lines() {
    let doc = "intro\n```bash\necho hi\n```\noutro\n";
    let block = &parse_code_blocks(doc)[0];
    assert_eq!(block.start_line, 1);
    assert_eq!(block.end_line, 3);
    assert_eq!(&doc[block.start_offset..block.end_offset], "```bash\necho hi\n```");
}

#[test]
fn test_parse_empty_block() {
    let blocks = parse_code_blocks("```\n```\n");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].content, "");
    assert_eq!(blocks[0].line_count(), 0);
}

#[test]
fn test_language_from_info() {
    assert_eq!(language_from_info("  PowerShell  extra"), "powershell");
    assert_eq!(language_from_info(""), "");
}

// ============================================================================
// Language Classifier Tests
// ============================================================================

#[test]
fn test_classify_is_case_and_whitespace_insensitive() {
    let allow = langs(&["sh", "bash", "zsh"]);
    for tag in ["BASH", " bash ", "Bash"] {
        let c = classify(tag, &allow);
        assert!(c.is_runnable, "{:?} should be runnable", tag);
        assert_eq!(c.strategy, ExecutionStrategy::Shell);
    }
}

#[test]
fn test_classify_empty_tag_with_empty_entry() {
    let c = classify("", &langs(&[""]));
    assert!(c.is_runnable);
    assert_eq!(c.strategy, ExecutionStrategy::Shell);
}

#[test]
fn test_classify_table_entry_not_allow_listed() {
    let c = classify("python", &default_supported_languages());
    assert!(!c.is_runnable);
    assert_eq!(
        c.strategy,
        ExecutionStrategy::Interpreter {
            command: "python3 -c".to_string()
        }
    );
}

#[test]
fn test_classify_unknown_tag_defaults_to_shell_when_allowed() {
    let c = classify("mytool", &langs(&["MyTool"]));
    assert!(c.is_runnable);
    assert_eq!(c.strategy, ExecutionStrategy::Shell);
}

#[test]
fn test_classify_unknown_tag_not_allowed_is_unsupported() {
    let c = classify("mytool", &default_supported_languages());
    assert!(!c.is_runnable);
    assert_eq!(c.strategy, ExecutionStrategy::Unsupported);
}

#[test]
fn test_classify_file_based_and_query() {
    let allow = langs(&["go", "sql"]);
    assert!(matches!(
        classify("Go", &allow).strategy,
        ExecutionStrategy::FileBased { ref extension, .. } if extension == ".go"
    ));
    assert_eq!(classify("sql", &allow).strategy, ExecutionStrategy::Query);
}

#[test]
fn test_language_table_overrides_replace_builtins() {
    let mut overrides = BTreeMap::new();
    overrides.insert("Go".to_string(), ExecutionStrategy::Shell);
    overrides.insert(
        "deno".to_string(),
        ExecutionStrategy::Interpreter {
            command: "deno eval".to_string(),
        },
    );
    let table = LanguageTable::with_overrides(&overrides);
    assert_eq!(table.lookup("go"), Some(&ExecutionStrategy::Shell));
    assert!(matches!(table.lookup("DENO"), Some(ExecutionStrategy::Interpreter { .. })));
    assert_eq!(table.len(), LanguageTable::builtin().len() + 1);
}

// ============================================================================
// Normalization Tests
// ============================================================================

#[test]
fn test_normalize_drops_blank_and_comment_lines() {
    let lines = normalize_lines("echo 1\n# comment\n\necho 2");
    assert_eq!(join_shell(&lines), "echo 1 && echo 2");
}

#[test]
fn test_normalize_indented_comment_dropped() {
    assert_eq!(normalize_lines("   # note\n\t\necho ok"), vec!["echo ok"]);
}

#[test]
fn test_escape_order_backslash_first() {
    assert_eq!(escape_double_quoted(r#"a\"b"#), r#"a\\\"b"#);
    assert_eq!(escape_double_quoted("`$x`"), "\\`\\$x\\`");
}

#[test]
fn test_interpreter_command_trims_whole_body() {
    let cmd = interpreter_command("python3 -c", "\n\nprint(1)\nprint(2)\n\n");
    assert_eq!(cmd, "python3 -c \"print(1)\nprint(2)\"");
}

// ============================================================================
// Settings Tests
// ============================================================================

#[test]
fn test_settings_defaults_from_empty_object() {
    let settings = Settings::from_json("{}").unwrap();
    assert_eq!(settings, Settings::default());
    assert!(settings.reuse_terminal);
    assert!(!settings.debug_logging);
    assert!(settings.supported_languages.contains(&String::new()));
    assert_eq!(settings.terminal_name, "MD Run");
}

#[test]
fn test_settings_camel_case_and_language_overrides() {
    let json = r#"{
        "reuseTerminal": false,
        "debugLogging": true,
        "supportedLanguages": ["bash", "python"],
        "languages": {
            "deno": { "kind": "interpreter", "command": "deno eval" },
            "zig": { "kind": "file", "extension": ".zig", "runner": "zig run" },
            "psql": { "kind": "query" }
        }
    }"#;
    let settings = Settings::from_json(json).unwrap();
    assert!(!settings.reuse_terminal);
    assert!(settings.debug_logging);
    assert_eq!(settings.supported_languages, langs(&["bash", "python"]));

    let table = settings.language_table();
    assert_eq!(
        table.lookup("deno"),
        Some(&ExecutionStrategy::Interpreter {
            command: "deno eval".to_string()
        })
    );
    assert!(matches!(table.lookup("zig"), Some(ExecutionStrategy::FileBased { .. })));
    assert_eq!(table.lookup("psql"), Some(&ExecutionStrategy::Query));
}

#[test]
fn test_settings_malformed_json_is_error() {
    assert!(Settings::from_json("{ not json").is_err());
}

#[test]
fn test_settings_missing_file_yields_defaults() {
    let path = std::env::temp_dir().join(format!("mdrun-missing-{}.json", uuid::Uuid::new_v4()));
    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_settings_load_from_file() {
    let path = std::env::temp_dir().join(format!("mdrun-settings-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, r#"{"summaryMaxChars": 20}"#).unwrap();
    let settings = Settings::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(settings.summary_max_chars, 20);
}

// ============================================================================
// Request Channel Tests
// ============================================================================

#[test]
fn test_parse_action_paths() {
    assert_eq!(parse_action("/run"), Some(RunAction::Run));
    assert_eq!(parse_action("/type"), Some(RunAction::Type));
    assert_eq!(parse_action("/exec"), None);
    assert_eq!(parse_action("run"), None);
}

#[test]
fn test_split_uri() {
    assert_eq!(
        split_uri("vscode://pub.ext/run?cmd=abc&lang=sh#frag").unwrap(),
        ("/run".to_string(), "cmd=abc&lang=sh".to_string())
    );
    assert_eq!(
        split_uri("  mdrun://host/type?cmd=a+b%3D  ").unwrap(),
        ("/type".to_string(), "cmd=a+b%3D".to_string())
    );
    assert_eq!(split_uri("mdrun://host").unwrap(), (String::new(), String::new()));
}

#[test]
fn test_unparseable_address_is_a_logged_decode_failure() {
    for uri in ["/type?cmd=x", "not a uri", ""] {
        let err = decode_uri(uri).unwrap_err();
        assert!(matches!(err, RequestError::InvalidUri(_)), "{uri}: {err:?}");
        assert!(!err.is_silent());
    }
}

#[test]
fn test_request_action_recognizes_only_our_paths() {
    assert_eq!(request_action("vscode://pub.ext/run?cmd=bHM="), Some(RunAction::Run));
    assert_eq!(request_action("vscode://pub.ext/type"), Some(RunAction::Type));
    assert_eq!(request_action("vscode://pub.ext/delete?cmd=bHM="), None);
    assert_eq!(request_action("Run"), None);
}

#[test]
fn test_percent_decode_strict() {
    assert_eq!(percent_decode_strict("a%20b%2Bc+d").unwrap(), "a b+c+d");
    assert!(matches!(
        percent_decode_strict("100%"),
        Err(RequestError::MalformedPercentEncoding(3))
    ));
    assert!(percent_decode_strict("%zz").is_err());
    assert!(percent_decode_strict("%FF").is_err());
}

#[test]
fn test_decode_query_falls_back_to_raw() {
    assert_eq!(decode_query("lang=c%2B%2B"), "lang=c++");
    assert_eq!(decode_query("cmd=YQ==&lang=50%"), "cmd=YQ==&lang=50%");
}

#[test]
fn test_query_pairs_keep_plus_and_split_on_first_equals() {
    let params = parse_query_pairs("cmd=ab+c/d==&lang=c++&flag&=ignored");
    assert_eq!(params["cmd"], "ab+c/d==");
    assert_eq!(params["lang"], "c++");
    assert_eq!(params["flag"], "");
    assert!(!params.contains_key(""));
}

#[test]
fn test_decode_request_with_plus_in_base64() {
    // ">>>" encodes to "Pj4+", which carries a literal plus sign.
    let encoded = STANDARD.encode("echo >>>");
    assert!(encoded.contains('+'));
    let query = format!("cmd={}&lang=bash&nonce=abc", encoded);
    let request = decode_request("/run", &query).unwrap().unwrap();
    assert_eq!(request.command, "echo >>>");
    assert_eq!(request.language, "bash");
    assert_eq!(request.nonce, "abc");
    assert_eq!(request.action, RunAction::Run);
}

#[test]
fn test_decode_request_defaults_for_optional_fields() {
    let query = format!("cmd={}", STANDARD.encode("pwd"));
    let request = decode_request("/type", &query).unwrap().unwrap();
    assert_eq!(request.language, "");
    assert_eq!(request.nonce, "");
    assert_eq!(request.action, RunAction::Type);
}

#[test]
fn test_decode_request_unknown_path_is_ignored() {
    assert!(decode_request("/delete", "cmd=!!!").unwrap().is_none());
}

#[test]
fn test_decode_request_errors() {
    assert!(matches!(
        decode_request("/run", "lang=bash"),
        Err(RequestError::MissingCommand)
    ));
    assert!(matches!(
        decode_request("/run", "cmd=%%%not-base64"),
        Err(RequestError::InvalidBase64(_))
    ));
    let blank = decode_request("/run", "cmd=");
    assert!(matches!(blank, Err(RequestError::MissingCommand)));
    assert!(blank.unwrap_err().is_silent());
}

#[test]
fn test_decode_request_invalid_utf8() {
    let query = format!("cmd={}", STANDARD.encode([0xff, 0xfe]));
    assert!(matches!(
        decode_request("/run", &query),
        Err(RequestError::InvalidUtf8(_))
    ));
}

#[test]
fn test_build_request_uri_decodes_back() {
    let command = "echo \"a & b\" | grep = + ü";
    let uri = build_request_uri("vscode://pub.md-run", "type", command, "bash", "tok 1");
    assert!(uri.starts_with("vscode://pub.md-run/type?cmd="));
    let request = decode_uri(&uri).unwrap().unwrap();
    assert_eq!(request.command, command);
    assert_eq!(request.nonce, "tok 1");
    assert_eq!(request.action, RunAction::Type);
}

#[test]
fn test_build_request_uri_coerces_unknown_action() {
    let uri = build_request_uri("x://y/", "launch", "ls", "", "");
    assert!(uri.starts_with("x://y/run?"));
}

// ============================================================================
// Airlock (Trust Gate) Tests
// ============================================================================

#[test]
fn test_authorize_allows_matching_token_in_trusted_workspace() {
    assert_eq!(authorize("tok", true, "tok", "ls", 60), Authorization::Allow);
}

#[test]
fn test_authorize_mismatch_requires_confirmation() {
    match authorize("other", true, "tok", "ls -la\npwd", 60) {
        Authorization::RequireConfirmation { summary } => {
            assert!(summary.starts_with("ls -la"));
            assert!(summary.contains("+1 more line"));
        }
        Authorization::Allow => panic!("mismatched token must not be allowed"),
    }
}

#[test]
fn test_authorize_untrusted_workspace_requires_confirmation() {
    assert!(matches!(
        authorize("tok", false, "tok", "ls", 60),
        Authorization::RequireConfirmation { .. }
    ));
}

#[test]
fn test_authorize_empty_tokens_never_match() {
    assert!(matches!(
        authorize("", true, "", "ls", 60),
        Authorization::RequireConfirmation { .. }
    ));
}

#[test]
fn test_preview_line_never_exceeds_bound() {
    let long = "x".repeat(500);
    for bound in [1usize, 2, 10, 59, 60, 61, 499, 500] {
        let preview = preview_line(&long, bound);
        assert!(preview.chars().count() <= bound, "bound {}", bound);
    }
    let cut = preview_line(&long, 10);
    assert!(cut.ends_with(ELLIPSIS));
    assert_eq!(preview_line("short", 10), "short");
}

#[test]
fn test_preview_line_counts_chars_not_bytes() {
    let preview = preview_line("ééééééééééé", 5);
    assert_eq!(preview, "éééé…");
}

#[test]
fn test_summarize_counts_extra_lines() {
    assert_eq!(summarize_command("one", 60), "one");
    assert_eq!(summarize_command("one\ntwo\nthree", 60), "one\n(+2 more lines)");
    assert_eq!(summarize_command("\n\none\n", 60), "one");
}

#[test]
fn test_session_capability() {
    let a = SessionCapability::generate();
    let b = SessionCapability::generate();
    assert!(!a.as_str().is_empty());
    assert_ne!(a, b);
    assert!(a.matches(a.as_str()));
    assert!(!a.matches(""));
    assert!(!format!("{:?}", a).contains(a.as_str()));
}

// ============================================================================
// Render + Lens Tests
// ============================================================================

#[test]
fn test_annotate_runnable_fence() {
    let default_html = render_fence_default("bash", "ls");
    let html = annotate_fence("bash", &default_html, "n0nce", &default_supported_languages());
    assert!(html.contains("class=\"md-run-terminal-wrapper\""));
    assert!(html.contains("data-md-run-terminal=\"1\""));
    assert!(html.contains("data-md-run-terminal-nonce=\"n0nce\""));
    assert!(html.contains("data-language=\"bash\""));
    assert!(html.contains("data-action=\"run\""));
    assert!(html.contains("data-action=\"type\""));
    assert!(html.contains(&default_html));
}

#[test]
fn test_annotate_non_runnable_fence_is_untouched() {
    let default_html = render_fence_default("rust", "fn main() {}");
    let html = annotate_fence("rust", &default_html, "n0nce", &default_supported_languages());
    assert_eq!(html, default_html);
}

#[test]
fn test_annotate_escapes_attribute_values() {
    let allow = langs(&["a\"b"]);
    let html = annotate_fence("A\"B", "<pre></pre>", "<x>", &allow);
    assert!(html.contains("data-language=\"a&quot;b\""));
    assert!(html.contains("data-md-run-terminal-nonce=\"&lt;x&gt;\""));
}

#[test]
fn test_render_default_escapes_content() {
    let html = render_fence_default("", "a < b && c");
    assert_eq!(html, "<pre><code>a &lt; b &amp;&amp; c\n</code></pre>\n");
}

#[test]
fn test_render_document_wraps_only_runnable_blocks() {
    let doc = "```bash\nls\n```\n\n```rust\nfn main() {}\n```\n";
    let html = render_document(doc, "tok", &default_supported_languages());
    assert_eq!(html.matches("md-run-terminal-wrapper").count(), 1);
    assert!(html.contains("language-rust"));
}

#[test]
fn test_code_lenses_for_runnable_blocks() {
    let doc = "```bash\nls\n```\n```python\nprint(1)\n```\n```\npwd\n```\n";
    let lenses = code_lenses(doc, &default_supported_languages());
    assert_eq!(lenses.len(), 2);
    assert_eq!(lenses[0].line, 0);
    assert_eq!(lenses[0].title, LENS_TITLE);
    assert_eq!(lenses[0].content, "ls");
    assert_eq!(lenses[1].line, 6);
    assert_eq!(lenses[1].language, "");
}
