use anyhow::{Context, Result};
use ou_filter_compiler::config::{load_catalog, RegistryConfig};
use ou_filter_compiler::rows;
use ou_filter_compiler::{ConditionCompiler, ConditionDecompiler, CustomFieldRecord, FieldKeyRegistry};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

const REGISTRY_FILE: &str = "field_keys.json";
const CATALOG_FILE: &str = "custom_fields.json";

/// 加载字段映射，优先使用JSON配置，失败时使用默认配置
fn load_registry() -> FieldKeyRegistry {
    match RegistryConfig::from_json_file(REGISTRY_FILE) {
        Ok(config) => {
            println!("✅ 成功从JSON配置文件加载字段映射: {}", REGISTRY_FILE);
            config.into_registry()
        }
        Err(e) => {
            println!("⚠️ 无法加载字段映射 ({}), 使用默认配置", e);
            FieldKeyRegistry::with_defaults()
        }
    }
}

/// 加载自定义字段目录，失败时使用空目录
fn load_custom_fields() -> Vec<CustomFieldRecord> {
    match load_catalog(CATALOG_FILE) {
        Ok(catalog) => {
            println!("✅ 加载了 {} 条自定义字段记录", catalog.len());
            catalog
        }
        Err(e) => {
            println!("⚠️ 无法加载自定义字段目录 ({}), 使用空目录", e);
            Vec::new()
        }
    }
}

fn print_help() {
    println!("命令:");
    println!("  compile <rows-json>        将条件行编译为查询文档");
    println!("  decompile <document-json>  将查询文档还原为条件行");
    println!("  help                       显示帮助");
    println!("  quit                       退出");
    println!();
    println!(r#"示例: compile [{{"key":"status","param":"EQUALS","value":"open"}}]"#);
}

fn run_command(line: &str, registry: &FieldKeyRegistry, catalog: &[CustomFieldRecord]) -> Result<()> {
    let (command, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match command {
        "compile" => {
            let rows: serde_json::Value = serde_json::from_str(payload).context("条件行不是合法的JSON")?;
            let document = ConditionCompiler::new(registry).compile_rows(&rows)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        "decompile" => {
            let document: serde_json::Value =
                serde_json::from_str(payload).context("查询文档不是合法的JSON")?;
            let conditions = ConditionDecompiler::new(registry, catalog).decompile_value(&document)?;
            println!("{}", serde_json::to_string_pretty(&rows::to_rows(&conditions))?);
        }
        "help" => print_help(),
        other => println!("未知命令: {} (输入 help 查看帮助)", other),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("--- OU Filter: 条件行与查询文档互转 ---");
    println!("\n[配置信息]:");
    let registry = load_registry();
    let catalog = load_custom_fields();
    println!();
    print_help();

    let mut editor = DefaultEditor::new().context("无法初始化行编辑器")?;
    loop {
        match editor.readline("ou-filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                if matches!(line, "quit" | "exit") {
                    break;
                }
                if let Err(e) = run_command(line, &registry, &catalog) {
                    println!("✗ {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
