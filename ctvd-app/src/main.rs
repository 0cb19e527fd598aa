//! CTVD (Capture Test Value Decoder) Application
//!
//! Decodes ATE capture files against a JSON capture layout and writes the
//! resulting records as ITUFF lines, JSON or a markdown summary report.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use ctvd_core::{Alphabet, CaptureBuffer, DecodeError, DecodeMode, DecodeOutcome, ResultSink};
use ctvd_kernel::{parse_token_list, persist_tokens, CaptureDecoder};
use ctvd_layout::{load_layout, LayoutError};
use ctvd_report::{ItuffWriter, MemoryTokenStore, ReportGenerator};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `0_tname_` / `0_strgval_` line pairs
    Ituff,
    /// One JSON document with every capture's outcome
    Json,
    /// Markdown summary report
    Report,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the capture layout definition (JSON)
    #[arg(short, long)]
    layout: PathBuf,

    /// Capture files to decode; decoded concurrently
    #[arg(short, long, num_args = 1.., required = true)]
    capture: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Ituff)]
    format: OutputFormat,

    /// Test instance name used as tname prefix
    #[arg(short, long, default_value = "")]
    instance: String,

    /// Capture files hold hex text instead of raw symbols
    #[arg(long)]
    hex: bool,

    /// Keep decoding other fields after an invalid symbol
    #[arg(long)]
    best_effort: bool,

    /// Persist a field's occurrence values: FIELD=TOKEN1,TOKEN2,...
    #[arg(short, long)]
    tokens: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// 一个捕获文件的解码结果
struct CaptureResult {
    path: PathBuf,
    result: Result<DecodeOutcome, DecodeError>,
}

/// 读取捕获文件，去掉所有空白（捕获文本可能按行折断）
fn read_capture(path: &Path, alphabet: Alphabet, hex: bool) -> Result<CaptureBuffer> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture file {}", path.display()))?;
    let symbols: String = text.split_whitespace().collect();

    if hex {
        if alphabet != Alphabet::Binary {
            bail!("--hex requires a binary layout, got {}", alphabet.name());
        }
        return CaptureBuffer::from_hex(&symbols)
            .with_context(|| format!("Invalid hex capture {}", path.display()));
    }
    Ok(CaptureBuffer::new(alphabet, symbols.into_bytes()))
}

/// 令牌持久化请求：字段名与令牌列表
#[derive(Debug)]
struct TokenRequest {
    field: String,
    tokens: Vec<String>,
}

/// 解析 `--tokens FIELD=TOKEN1,TOKEN2,...`
///
/// 令牌对应单次测试的数值，多个捕获会互相覆盖，因此只接受一个捕获
fn parse_token_request(spec: &str, captures: usize) -> Result<TokenRequest> {
    let Some((field, list)) = spec.split_once('=') else {
        bail!("--tokens expects FIELD=TOKEN1,TOKEN2,..., got '{spec}'");
    };
    if captures != 1 {
        bail!("--tokens requires exactly one capture, got {captures}");
    }
    Ok(TokenRequest {
        field: field.trim().to_string(),
        tokens: parse_token_list(list),
    })
}

/// 写入令牌存储，返回待输出的 `(令牌, 值)` 列表
///
/// 解码失败的捕获不写入任何令牌
fn collect_tokens(results: &[CaptureResult], request: &TokenRequest) -> Result<Vec<(String, i128)>> {
    let mut store = MemoryTokenStore::new();
    for outcome in results.iter().filter_map(|c| c.result.as_ref().ok()) {
        let Some(values) = outcome.occurrence_values(&request.field) else {
            bail!("Field '{}' not found in layout {}", request.field, outcome.layout);
        };
        persist_tokens(&mut store, request.tokens.as_slice(), values)?;
    }
    Ok(store
        .iter()
        .map(|(token, value)| (token.to_string(), value))
        .collect())
}

/// 错误类别标签，优先取解码或布局错误自身的类别
fn error_category(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DecodeError>() {
            return e.category();
        }
        if let Some(e) = cause.downcast_ref::<LayoutError>() {
            return e.category();
        }
    }
    "INFRASTRUCTURE"
}

fn init_logging(verbose: bool) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("ctvd=debug")
    } else {
        EnvFilter::new("ctvd=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    debug!("Logging initialized (verbose={verbose})");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    // 基础设施错误与解码错误同为退出码2，器件失败为1
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("[{}] {:#}", error_category(&e), e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let definition = load_layout(&args.layout)
        .with_context(|| format!("Failed to load layout {}", args.layout.display()))?;
    let mut options = definition.options;
    if args.best_effort {
        options.mode = DecodeMode::BestEffort;
    }
    let alphabet = definition.layout.alphabet;
    let decoder = Arc::new(CaptureDecoder::new(definition.layout)?.with_options(options));
    info!(
        "Loaded layout {} ({} fields, {} symbols)",
        decoder.layout().name,
        decoder.layout().fields.len(),
        decoder.layout().required_length()?
    );

    let token_request = args
        .tokens
        .as_deref()
        .map(|spec| parse_token_request(spec, args.capture.len()))
        .transpose()?;

    // 每个捕获在阻塞线程池中独立解码
    let mut handles = Vec::with_capacity(args.capture.len());
    for path in &args.capture {
        let capture = read_capture(path, alphabet, args.hex)?;
        let decoder = Arc::clone(&decoder);
        let path = path.clone();
        handles.push(tokio::task::spawn_blocking(move || CaptureResult {
            result: decoder.decode(&capture),
            path,
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.context("Decode task panicked")?);
    }

    let mut decode_errors = 0;
    let mut failures = 0;
    for capture in &results {
        match &capture.result {
            Ok(outcome) if outcome.passed => {
                info!("{}: PASS", capture.path.display());
            }
            Ok(outcome) => {
                failures += 1;
                info!(
                    "{}: FAIL ({} fields failed)",
                    capture.path.display(),
                    outcome.failed_fields().count()
                );
            }
            Err(e) => {
                decode_errors += 1;
                error!("{}: [{}] {}", capture.path.display(), e.category(), e);
            }
        }
    }

    // 先完成令牌写入，失败时不输出任何记录
    let tokens = match &token_request {
        Some(request) => collect_tokens(&results, request)?,
        None => Vec::new(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Ituff => {
            let mut writer = ItuffWriter::new(&mut out, args.instance.as_str());
            for outcome in results.iter().filter_map(|c| c.result.as_ref().ok()) {
                writer.emit_all(&outcome.records)?;
            }
        }
        OutputFormat::Json => {
            let documents = results
                .iter()
                .map(|c| {
                    let capture = c.path.display().to_string();
                    Ok(match &c.result {
                        Ok(outcome) => serde_json::json!({
                            "capture": capture,
                            "outcome": serde_json::to_value(outcome)?,
                        }),
                        Err(e) => serde_json::json!({
                            "capture": capture,
                            "error": { "category": e.category(), "message": e.to_string() },
                        }),
                    })
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;
            serde_json::to_writer_pretty(&mut out, &documents)?;
            writeln!(out)?;
        }
        OutputFormat::Report => {
            let mut generator =
                ReportGenerator::new(format!("{} decode report", decoder.layout().name));
            for capture in results.iter() {
                let label = capture.path.display().to_string();
                match &capture.result {
                    Ok(outcome) => generator.add_outcome(label, outcome.clone()),
                    Err(e) => generator.add_error(label, e.clone()),
                }
            }
            write!(out, "{}", generator.generate_summary_report())?;
        }
    }

    for (token, value) in &tokens {
        writeln!(out, "{token}={value}")?;
    }
    out.flush()?;

    if decode_errors > 0 {
        Ok(ExitCode::from(2))
    } else if failures > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctvd_core::{BitOrder, CaptureLayout, FieldDescriptor};

    fn decoded(capture: &str) -> CaptureResult {
        let layout = CaptureLayout::new("T", Alphabet::Binary).field(
            FieldDescriptor::contiguous("v", 0, 2, BitOrder::MsbFirst).with_repeat(2, 2),
        );
        CaptureResult {
            path: PathBuf::from("unit.cap"),
            result: CaptureDecoder::new(layout)
                .unwrap()
                .decode(&CaptureBuffer::binary(capture)),
        }
    }

    #[test]
    fn test_token_request_needs_single_capture() {
        let request = parse_token_request("v = A, B", 1).unwrap();
        assert_eq!(request.field, "v");
        assert_eq!(request.tokens, vec!["A", "B"]);

        let err = parse_token_request("v=A,B", 2).unwrap_err();
        assert!(err.to_string().contains("exactly one capture"));
        assert!(parse_token_request("v", 1).is_err());
    }

    #[test]
    fn test_collect_tokens() {
        let request = parse_token_request("v=A,B", 1).unwrap();
        let tokens = collect_tokens(&[decoded("0111")], &request).unwrap();
        assert_eq!(tokens, vec![("A".to_string(), 1), ("B".to_string(), 3)]);

        // 解码失败的捕获不写入令牌
        assert!(collect_tokens(&[decoded("011")], &request).unwrap().is_empty());
    }

    #[test]
    fn test_token_errors_surface_before_output() {
        let request = parse_token_request("v=A", 1).unwrap();
        let err = collect_tokens(&[decoded("0111")], &request).unwrap_err();
        assert_eq!(error_category(&err), "TOKEN_COUNT_MISMATCH");

        let request = parse_token_request("w=A", 1).unwrap();
        let err = collect_tokens(&[decoded("0111")], &request).unwrap_err();
        assert_eq!(error_category(&err), "INFRASTRUCTURE");
    }

    #[test]
    fn test_error_category_through_context() {
        let err = anyhow::Error::new(LayoutError::Decode(DecodeError::InvalidExpression(
            "3-".to_string(),
        )))
        .context("Failed to load layout t.json");
        assert_eq!(error_category(&err), "INVALID_EXPRESSION");

        let err = anyhow::Error::new(DecodeError::InvalidDescriptor {
            field: "v".to_string(),
            reason: "width must be at least 1".to_string(),
        });
        assert_eq!(error_category(&err), "INVALID_DESCRIPTOR");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = anyhow::Error::new(io).context("Failed to read capture file");
        assert_eq!(error_category(&err), "INFRASTRUCTURE");
    }
}
