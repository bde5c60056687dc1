//! Stylesheet reference rewriting.
//!
//! Style sources refer to images through quoted placeholders:
//!
//! ```text
//! background: url("versionerUrl(dir1/abc.jpg)");
//!   -> background: url(/assets/abc.629f545a3f7cea350715263cd5ef3012.jpg);
//! background: url("versionerDataUri(icons/dot.png)");
//!   -> background: url(data:image/png;base64,iVBORw0...);
//! ```
//!
//! `assetUrl` and `assetDataUri` are accepted as aliases. The quotes belong
//! to the placeholder and are consumed with it. All other
//! text is left untouched. Images are committed before styles are
//! processed, so every reference resolves against the finished image class.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::compile::{CompileContext, CompilerSpec, compile};
use super::{ProcessFuture, Processor};
use crate::asset::{AssetClass, LogicalPath, SharedIndex, versioned_url};
use crate::config::VersionerConfig;
use crate::error::BuildError;
use crate::logger::BuildLog;
use crate::utils::mime;

/// What an unresolved image reference turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingReferencePolicy {
    /// Fail the style file.
    #[default]
    Fail,
    /// Substitute `about:invalid#missing-asset=<path>`.
    Marker,
    /// Substitute nothing.
    Empty,
}

/// Marker substituted under `MissingReferencePolicy::Marker`.
pub fn missing_marker(reference: &str) -> String {
    format!("about:invalid#missing-asset={reference}")
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""(?:versioner|asset)Url\(([^"]+?)\)"|"(?:versioner|asset)DataUri\(([^"]+?)\)""#)
            .unwrap()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Url,
    DataUri,
}

/// Style-stage processing step: placeholder substitution, then compilation.
#[derive(Clone)]
pub struct StyleRewriter {
    index: SharedIndex,
    image_url_root: String,
    policy: MissingReferencePolicy,
    compiler: Option<CompilerSpec>,
    include_root: Option<PathBuf>,
    lessc: Option<PathBuf>,
    timeout: Option<Duration>,
    log: Arc<dyn BuildLog>,
}

impl StyleRewriter {
    /// Build from the style class configuration. Image references resolve
    /// through `index` with the image class URL root.
    pub fn new(config: &VersionerConfig, index: SharedIndex, log: Arc<dyn BuildLog>) -> Self {
        let style = config.style.clone().unwrap_or_default();
        Self {
            index,
            image_url_root: config.url_root_for(AssetClass::Image).to_string(),
            policy: style.missing_reference,
            compiler: style.compiler,
            include_root: style.root,
            lessc: style.lessc,
            timeout: style.compiler_timeout,
            log,
        }
    }

    /// Substitute every placeholder in `text`.
    ///
    /// The index read lock is held only for the duration of this call.
    pub fn rewrite(&self, text: &str, file: &LogicalPath) -> Result<String, BuildError> {
        let index = self.index.read();
        let mut failure = None;

        let rewritten = placeholder_regex().replace_all(text, |caps: &Captures<'_>| {
            let (kind, reference) = match (caps.get(1), caps.get(2)) {
                (Some(m), _) => (Placeholder::Url, m.as_str().trim()),
                (None, Some(m)) => (Placeholder::DataUri, m.as_str().trim()),
                (None, None) => return String::new(),
            };
            let path = LogicalPath::new(reference);

            let resolved = match kind {
                Placeholder::Url => index
                    .key_for(AssetClass::Image, &path)
                    .map(|key| versioned_url(&self.image_url_root, key)),
                Placeholder::DataUri => index
                    .record_for(AssetClass::Image, &path)
                    .and_then(|record| {
                        let bytes = record.bytes.as_ref()?;
                        Some(format!(
                            "data:{};base64,{}",
                            mime::essence(mime::from_file_name(&record.file_name)),
                            STANDARD.encode(bytes)
                        ))
                    }),
            };

            resolved.unwrap_or_else(|| {
                let what = match kind {
                    Placeholder::Url => "image",
                    Placeholder::DataUri => "data URI image",
                };
                let message = format!("Missing {what}: {reference} (in {file})");
                match self.policy {
                    MissingReferencePolicy::Fail => {
                        self.log.error(&message, None);
                        failure.get_or_insert_with(|| reference.to_string());
                        String::new()
                    }
                    MissingReferencePolicy::Marker => {
                        self.log.warn(&message);
                        missing_marker(reference)
                    }
                    MissingReferencePolicy::Empty => {
                        self.log.warn(&message);
                        String::new()
                    }
                }
            })
        });

        match failure {
            Some(reference) => Err(BuildError::MissingReference {
                path: file.to_string(),
                reference,
            }),
            None => Ok(rewritten.into_owned()),
        }
    }

    async fn run(&self, bytes: Vec<u8>, file: &LogicalPath) -> Result<Vec<u8>, BuildError> {
        let text = String::from_utf8(bytes).map_err(|e| BuildError::Compile {
            path: file.to_string(),
            message: format!("stylesheet is not valid UTF-8: {e}"),
        })?;

        let rewritten = self.rewrite(&text, file)?;

        let ctx = CompileContext {
            path: file.to_string(),
            include_root: self.include_root.clone(),
            lessc: self.lessc.clone(),
            timeout: self.timeout,
        };
        compile(self.compiler.as_ref(), rewritten, &ctx).await.inspect_err(|e| {
            self.log.error(&format!("Style compilation failed: {file}"), Some(e));
        })
    }
}

impl Processor for StyleRewriter {
    fn process<'a>(&'a self, bytes: Vec<u8>, logical: &'a LogicalPath) -> ProcessFuture<'a> {
        Box::pin(self.run(bytes, logical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetIndex;
    use crate::config::TypeConfig;
    use crate::logger::{RecordingLog, SilentLog};

    const PNG: &[u8] = b"\x89PNG fake";

    fn index_with_images() -> SharedIndex {
        let index = AssetIndex::shared();
        {
            let mut w = index.write();
            w.commit(AssetClass::Image, LogicalPath::new("dir1/abc.jpg"), "abc.1111.jpg".into(), b"jpg".to_vec());
            w.commit(AssetClass::Image, LogicalPath::new("dot.png"), "dot.2222.png".into(), PNG.to_vec());
        }
        index
    }

    fn rewriter(style: TypeConfig, index: SharedIndex, log: Arc<dyn BuildLog>) -> StyleRewriter {
        let config = VersionerConfig::new("http://localhost:5678/assets/")
            .image(TypeConfig::default())
            .style(style);
        StyleRewriter::new(&config, index, log)
    }

    fn file() -> LogicalPath {
        LogicalPath::new("site.css")
    }

    #[test]
    fn test_rewrite_urls_and_data_uris() {
        let r = rewriter(TypeConfig::default(), index_with_images(), Arc::new(SilentLog));
        let css = concat!(
            ".a { background: url(\"versionerUrl(dir1/abc.jpg)\"); }\n",
            ".b { background: url(\"versionerUrl(/dir1/abc.jpg)\"); }\n",
            ".c { background: url(\"versionerDataUri(dot.png)\"); }\n",
            ".d { color: red; }\n",
        );
        let out = r.rewrite(css, &file()).unwrap();

        let encoded = STANDARD.encode(PNG);
        let expected = format!(
            ".a {{ background: url(http://localhost:5678/assets/abc.1111.jpg); }}\n\
             .b {{ background: url(http://localhost:5678/assets/abc.1111.jpg); }}\n\
             .c {{ background: url(data:image/png;base64,{encoded}); }}\n\
             .d {{ color: red; }}\n"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_asset_aliases_match_versioner_forms() {
        let r = rewriter(TypeConfig::default(), index_with_images(), Arc::new(SilentLog));
        let canonical = r
            .rewrite("a{b:url(\"versionerUrl(dir1/abc.jpg)\")} c{d:url(\"versionerDataUri(dot.png)\")}", &file())
            .unwrap();
        let alias = r
            .rewrite("a{b:url(\"assetUrl(dir1/abc.jpg)\")} c{d:url(\"assetDataUri(dot.png)\")}", &file())
            .unwrap();
        assert_eq!(canonical, alias);
        assert!(canonical.starts_with("a{b:url(http://localhost:5678/assets/abc.1111.jpg)}"));
    }

    #[test]
    fn test_relative_reference_resolves() {
        let r = rewriter(TypeConfig::default(), index_with_images(), Arc::new(SilentLog));
        let out = r.rewrite("\"versionerUrl(./img/../dir1/abc.jpg)\"", &file()).unwrap();
        assert_eq!(out, "http://localhost:5678/assets/abc.1111.jpg");
    }

    #[test]
    fn test_unresolved_versioner_form_fails() {
        let r = rewriter(TypeConfig::default(), index_with_images(), Arc::new(SilentLog));
        assert!(matches!(
            r.rewrite("a { b: url(\"versionerUrl(dir1/missing.jpg)\"); }", &file()),
            Err(BuildError::MissingReference { .. })
        ));
    }

    #[test]
    fn test_text_without_placeholders_unchanged() {
        let r = rewriter(TypeConfig::default(), index_with_images(), Arc::new(SilentLog));
        let css = ".x { background: url('plain.png'); content: \"versionerUrl\"; }";
        assert_eq!(r.rewrite(css, &file()).unwrap(), css);
    }

    #[test]
    fn test_missing_reference_fails_by_default() {
        let log = Arc::new(RecordingLog::default());
        let r = rewriter(TypeConfig::default(), index_with_images(), log.clone());
        let err = r
            .rewrite("a { b: url(\"assetUrl(nope.png)\"); }", &file())
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::MissingReference { ref path, ref reference } if path == "site.css" && reference == "nope.png"
        ));
        assert!(log.contains("error", "Missing image: nope.png"));
    }

    #[test]
    fn test_missing_reference_marker() {
        let style = TypeConfig::default().missing_reference(MissingReferencePolicy::Marker);
        let r = rewriter(style, index_with_images(), Arc::new(SilentLog));
        let out = r
            .rewrite("a { b: url(\"assetDataUri(gone.png)\"); }", &file())
            .unwrap();
        assert_eq!(out, "a { b: url(about:invalid#missing-asset=gone.png); }");
    }

    #[test]
    fn test_missing_reference_empty() {
        let log = Arc::new(RecordingLog::default());
        let style = TypeConfig::default().missing_reference(MissingReferencePolicy::Empty);
        let r = rewriter(style, index_with_images(), log.clone());
        let out = r.rewrite("a { b: url(\"assetUrl(gone.png)\"); }", &file()).unwrap();
        assert_eq!(out, "a { b: url(); }");
        assert_eq!(log.count("warn"), 1);
        assert_eq!(log.count("error"), 0);
    }

    #[test]
    fn test_data_uri_after_buffers_released_is_missing() {
        let index = index_with_images();
        index.write().release_buffers();
        let r = rewriter(TypeConfig::default(), index, Arc::new(SilentLog));

        // The URL still resolves, the data URI does not
        assert!(r.rewrite("\"assetUrl(dot.png)\"", &file()).is_ok());
        assert!(matches!(
            r.rewrite("\"assetDataUri(dot.png)\"", &file()),
            Err(BuildError::MissingReference { .. })
        ));
    }

    #[test]
    fn test_style_classes_do_not_resolve_as_images() {
        let index = index_with_images();
        index.write().commit(
            AssetClass::Style,
            LogicalPath::new("only-style.css"),
            "only-style.3333.css".into(),
            b"x".to_vec(),
        );
        let r = rewriter(TypeConfig::default(), index, Arc::new(SilentLog));
        assert!(r.rewrite("\"assetUrl(only-style.css)\"", &file()).is_err());
    }

    #[tokio::test]
    async fn test_process_plain_css_passthrough() {
        let r = rewriter(TypeConfig::default(), index_with_images(), Arc::new(SilentLog));
        let css = b".a { color: blue; }\n".to_vec();
        let out = r.process(css.clone(), &file()).await.unwrap();
        assert_eq!(out, css);
    }

    #[tokio::test]
    async fn test_process_with_custom_compiler() {
        let style = TypeConfig::default()
            .compiler(CompilerSpec::custom(|css| async move { Ok(format!("/* built */\n{css}").into_bytes()) }));
        let r = rewriter(style, index_with_images(), Arc::new(SilentLog));
        let out = r
            .process(b".a { background: url(\"assetUrl(dir1/abc.jpg)\"); }".to_vec(), &file())
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "/* built */\n.a { background: url(http://localhost:5678/assets/abc.1111.jpg); }"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runs_configured_lessc() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let lessc = dir.path().join("fake-lessc");
        std::fs::write(&lessc, "#!/bin/sh\nprintf '/* less */'\ncat\n").unwrap();
        std::fs::set_permissions(&lessc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let style = TypeConfig::default().compiler(CompilerSpec::less()).lessc(&lessc);
        let r = rewriter(style, index_with_images(), Arc::new(SilentLog));
        let out = r
            .process(b".a { b: url(\"versionerUrl(dir1/abc.jpg)\"); }".to_vec(), &file())
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "/* less */.a { b: url(http://localhost:5678/assets/abc.1111.jpg); }"
        );
    }

    #[tokio::test]
    async fn test_process_rejects_invalid_utf8() {
        let r = rewriter(TypeConfig::default(), index_with_images(), Arc::new(SilentLog));
        let err = r.process(vec![0xff, 0xfe], &file()).await.unwrap_err();
        assert!(matches!(err, BuildError::Compile { .. }));
    }
}
