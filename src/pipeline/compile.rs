//! Style compiler dispatch.
//!
//! Supported compilers:
//! - `less`: the external `lessc` binary, fed through stdin
//! - `lightningcss`: in-process parse and print (optionally minified)
//! - custom: any async `String -> bytes` function supplied by the caller
//!
//! No compiler means the (already rewritten) text is plain CSS and is
//! committed as-is.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{BuildError, ConfigError};

/// Error type returned by custom compilers.
pub type CompileError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by custom compilers.
pub type CompileFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, CompileError>> + Send>>;

/// Default executable for the `less` compiler, looked up on `PATH`.
pub const LESSC: &str = "lessc";

/// Compilers shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCompiler {
    Less,
    Lightning { minify: bool },
}

impl FromStr for BuiltinCompiler {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "less" => Ok(Self::Less),
            "lightningcss" | "lightning" => Ok(Self::Lightning { minify: false }),
            _ => Err(ConfigError::UnknownCompiler(s.to_string())),
        }
    }
}

/// Caller-supplied compiler function.
#[derive(Clone)]
pub struct CustomCompiler(Arc<dyn Fn(String) -> CompileFuture + Send + Sync>);

impl CustomCompiler {
    pub fn call(&self, source: String) -> CompileFuture {
        (self.0)(source)
    }
}

impl fmt::Debug for CustomCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCompiler(..)")
    }
}

/// Which compiler turns rewritten style text into committed bytes.
#[derive(Debug, Clone)]
pub enum CompilerSpec {
    Builtin(BuiltinCompiler),
    Custom(CustomCompiler),
}

impl CompilerSpec {
    pub const fn less() -> Self {
        Self::Builtin(BuiltinCompiler::Less)
    }

    pub const fn lightning(minify: bool) -> Self {
        Self::Builtin(BuiltinCompiler::Lightning { minify })
    }

    /// Wrap an async function as a compiler.
    ///
    /// ```ignore
    /// let upper = CompilerSpec::custom(|css| async move { Ok(css.to_uppercase().into_bytes()) });
    /// ```
    pub fn custom<F, Fut>(compile: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>, CompileError>> + Send + 'static,
    {
        Self::Custom(CustomCompiler(Arc::new(move |source| Box::pin(compile(source)))))
    }
}

/// Per-file compile settings.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    /// Logical path of the style file, for diagnostics.
    pub path: String,
    /// Include path handed to `lessc` (the style root).
    pub include_root: Option<PathBuf>,
    /// `lessc` executable; `LESSC` when unset.
    pub lessc: Option<PathBuf>,
    /// Upper bound for one compiler invocation.
    pub timeout: Option<Duration>,
}

impl CompileContext {
    /// Executable run for the `less` compiler.
    pub fn lessc(&self) -> &Path {
        self.lessc.as_deref().unwrap_or(Path::new(LESSC))
    }
}

/// Compile rewritten style text into final bytes.
pub async fn compile(
    compiler: Option<&CompilerSpec>,
    source: String,
    ctx: &CompileContext,
) -> Result<Vec<u8>, BuildError> {
    let Some(compiler) = compiler else {
        return Ok(source.into_bytes());
    };

    let run = async {
        match compiler {
            CompilerSpec::Builtin(BuiltinCompiler::Less) => run_lessc(source, ctx).await,
            CompilerSpec::Builtin(BuiltinCompiler::Lightning { minify }) => {
                run_lightning(source, *minify, ctx).await
            }
            CompilerSpec::Custom(custom) => {
                custom.call(source).await.map_err(|e| BuildError::Compile {
                    path: ctx.path.clone(),
                    message: e.to_string(),
                })
            }
        }
    };

    match ctx.timeout {
        Some(timeout) => tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| BuildError::CompileTimeout {
                path: ctx.path.clone(),
                timeout,
            })?,
        None => run.await,
    }
}

/// Run `lessc --include-path=<root> -` with the source on stdin.
async fn run_lessc(source: String, ctx: &CompileContext) -> Result<Vec<u8>, BuildError> {
    let fail = |message: String| BuildError::Compile {
        path: ctx.path.clone(),
        message,
    };

    let program = ctx.lessc();
    let mut cmd = Command::new(program);
    cmd.arg("--no-color");
    if let Some(root) = &ctx.include_root {
        cmd.arg(format!("--include-path={}", root.display()));
    }
    cmd.arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| fail(format!("failed to run `{}`: {e}", program.display())))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(source.as_bytes())
            .await
            .map_err(|e| fail(format!("failed to write to `{}`: {e}", program.display())))?;
        // Closing stdin lets lessc start compiling
        drop(stdin);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| fail(format!("`{}` did not finish: {e}", program.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(fail(stderr.trim().to_string()));
    }

    Ok(output.stdout)
}

/// Parse and re-print the stylesheet with lightningcss.
async fn run_lightning(source: String, minify: bool, ctx: &CompileContext) -> Result<Vec<u8>, BuildError> {
    let path = ctx.path.clone();
    let printed = tokio::task::spawn_blocking(move || print_stylesheet(&source, &path, minify)).await?;

    printed
        .map(String::into_bytes)
        .map_err(|message| BuildError::Compile {
            path: ctx.path.clone(),
            message,
        })
}

fn print_stylesheet(source: &str, filename: &str, minify: bool) -> Result<String, String> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    let stylesheet = StyleSheet::parse(source, options).map_err(|e| e.to_string())?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CompileContext {
        CompileContext {
            path: "site.css".into(),
            ..CompileContext::default()
        }
    }

    #[test]
    fn test_parse_builtin_names() {
        assert_eq!("less".parse::<BuiltinCompiler>().unwrap(), BuiltinCompiler::Less);
        assert_eq!(
            "lightningcss".parse::<BuiltinCompiler>().unwrap(),
            BuiltinCompiler::Lightning { minify: false }
        );
        assert!(matches!(
            "sass".parse::<BuiltinCompiler>(),
            Err(ConfigError::UnknownCompiler(name)) if name == "sass"
        ));
    }

    #[tokio::test]
    async fn test_no_compiler_is_passthrough() {
        let css = ".a { color: red; }\n".to_string();
        let out = compile(None, css.clone(), &ctx()).await.unwrap();
        assert_eq!(out, css.into_bytes());
    }

    #[tokio::test]
    async fn test_custom_compiler() {
        let spec = CompilerSpec::custom(|css| async move { Ok(css.to_uppercase().into_bytes()) });
        let out = compile(Some(&spec), "a{}".into(), &ctx()).await.unwrap();
        assert_eq!(out, b"A{}");
    }

    #[tokio::test]
    async fn test_custom_compiler_error_is_compile_error() {
        let spec = CompilerSpec::custom(|_| async move { Err::<Vec<u8>, CompileError>("bad token".into()) });
        let err = compile(Some(&spec), "a{".into(), &ctx()).await.unwrap_err();
        assert!(matches!(err, BuildError::Compile { ref message, .. } if message == "bad token"));
    }

    #[tokio::test]
    async fn test_compiler_timeout() {
        let spec = CompilerSpec::custom(|css| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(css.into_bytes())
        });
        let ctx = CompileContext {
            timeout: Some(Duration::from_millis(20)),
            ..ctx()
        };
        let err = compile(Some(&spec), "a{}".into(), &ctx).await.unwrap_err();
        assert!(matches!(err, BuildError::CompileTimeout { .. }));
    }

    #[tokio::test]
    async fn test_lightning_minify() {
        let spec = CompilerSpec::lightning(true);
        let out = compile(Some(&spec), ".a {\n  color: red;\n}\n".into(), &ctx())
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ".a{color:red}");
    }

    #[tokio::test]
    async fn test_lightning_parse_error() {
        let spec = CompilerSpec::lightning(false);
        let err = compile(Some(&spec), ".a..b { color: red; }".into(), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Compile { ref path, .. } if path == "site.css"));
    }

    #[test]
    fn test_lessc_defaults_to_path_lookup() {
        assert_eq!(ctx().lessc(), Path::new(LESSC));
        let ctx = CompileContext {
            lessc: Some(PathBuf::from("node_modules/.bin/lessc")),
            ..ctx()
        };
        assert_eq!(ctx.lessc(), Path::new("node_modules/.bin/lessc"));
    }

    #[tokio::test]
    async fn test_lessc_not_installed() {
        let ctx = CompileContext {
            lessc: Some(PathBuf::from("/nonexistent/bin/lessc")),
            ..ctx()
        };
        let err = compile(Some(&CompilerSpec::less()), "a{}".into(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Compile { ref message, .. } if message.contains("failed to run `/nonexistent/bin/lessc`")
        ));
    }

    #[cfg(unix)]
    fn fake_lessc(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("lessc");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lessc_reads_stdin_with_include_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = r#"for arg in "$@"; do
  case "$arg" in --include-path=*) echo "/* $arg */" ;; esac
done
cat"#;
        let ctx = CompileContext {
            path: "site.less".into(),
            include_root: Some(dir.path().to_path_buf()),
            lessc: Some(fake_lessc(dir.path(), script)),
            timeout: None,
        };

        let out = compile(Some(&CompilerSpec::less()), ".a { b: c; }".into(), &ctx)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("/* --include-path={} */\n.a {{ b: c; }}", dir.path().display())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lessc_failure_reports_stderr() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = "cat > /dev/null\necho 'ParseError: Unrecognised input' >&2\nexit 1";
        let ctx = CompileContext {
            lessc: Some(fake_lessc(dir.path(), script)),
            ..ctx()
        };

        let err = compile(Some(&CompilerSpec::less()), ".a {".into(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Compile { ref path, ref message } if path == "site.css" && message == "ParseError: Unrecognised input"
        ));
    }
}
