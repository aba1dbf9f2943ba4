use clap::Parser;
use dialoguer::Confirm;
use formfill::cli::{Cli, Commands};
use formfill::config::Config;
use formfill::error::{FormFillError, Result};
use formfill::file_store::JsonFileStore;
use formfill::report;
use formfill_common::{disambiguate_tags, find_matches, store, StoreBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = Config::load()?;
    let backend = JsonFileStore::new(config.resolve_store_path(cli.store.as_deref())?);
    log::debug!("ストア: {}", backend.path().display());

    match cli.command {
        Commands::Matches { url, count } => {
            require_store(&backend)?;
            let candidates = disambiguate_tags(find_matches(&backend, &url, count).await?);

            if candidates.is_empty() {
                println!("候補はありません: {}", url);
                return Ok(());
            }
            println!("🔍 {}件の候補 (入力数 {})\n", candidates.len(), count);
            for candidate in &candidates {
                println!("  {}", report::candidate_line(candidate));
                println!("      {}", candidate.source_url);
            }
        }

        Commands::List { filter } => {
            require_store(&backend)?;
            let all = backend.get_all().await?;
            let summaries = report::site_summaries(&all, filter.as_deref());

            if summaries.is_empty() {
                println!("テストデータはありません");
                return Ok(());
            }
            for summary in &summaries {
                println!("📄 {}", summary.title);
                println!("   {}", summary.url);
                println!(
                    "   タグ: {} ／ 更新: {}",
                    summary.tags.join(", "),
                    report::format_timestamp(summary.last_updated.as_deref())
                );
            }
        }

        Commands::Show { url, tag } => {
            require_store(&backend)?;
            let record = backend
                .get(&[url.as_str()])
                .await?
                .record(&url)
                .ok_or_else(|| formfill_common::Error::SiteNotFound(url.clone()))?;

            println!("📄 {}", record.display_title(&url));
            println!("   更新: {}\n", report::format_timestamp(record.last_updated()));

            let entries = match &tag {
                Some(name) => {
                    let entry = record.tag(name).ok_or_else(|| formfill_common::Error::TagNotFound {
                        url: url.clone(),
                        tag: name.clone(),
                    })?;
                    vec![(name.as_str(), entry)]
                }
                None => record.tags(),
            };
            for (name, entry) in entries {
                println!("🏷  {} ({}項目)", name, entry.len());
                for (i, saved) in entry.iter().enumerate() {
                    println!("   {}", report::entry_line(i, saved));
                }
            }
        }

        Commands::Stats => {
            require_store(&backend)?;
            let stats = store::stats(&backend.get_all().await?);
            println!("サイト数: {}", stats.sites);
            println!("タグ数: {}", stats.tags);
        }

        Commands::DeleteTag { url, tag, yes } => {
            require_store(&backend)?;
            confirm(&format!("「{}」を削除しますか？", tag), yes)?;

            let removed_site = store::delete_tag(&backend, &url, &tag).await?;
            println!("✔ タグを削除しました: {}", tag);
            if removed_site {
                println!("✔ タグが無くなったためサイトを削除しました: {}", url);
            }
        }

        Commands::DeleteSite { url, yes } => {
            require_store(&backend)?;
            confirm(&format!("{} のデータを全て削除しますか？", url), yes)?;

            store::delete_site(&backend, &url).await?;
            println!("✔ サイトを削除しました: {}", url);
        }

        Commands::CopyTag { from, tag, to, yes } => {
            require_store(&backend)?;
            match store::copy_tag(&backend, &from, &tag, &to, yes).await {
                Err(formfill_common::Error::TagExists { .. }) => {
                    confirm(&format!("「{}」は既に存在します。上書きしますか？", tag), false)?;
                    store::copy_tag(&backend, &from, &tag, &to, true).await?;
                }
                other => other?,
            }
            println!("✔ 「{}」を複製しました: {}", tag, to);
        }

        Commands::Import { input, yes } => {
            let content = std::fs::read_to_string(&input)?;
            confirm("既存のデータは全て置き換えられます。続けますか？", yes)?;

            let count = store::import_store(&backend, &content).await?;
            println!("✔ {}件のエントリを読み込みました", count);
        }

        Commands::Export { output, site, tag } => {
            require_store(&backend)?;
            let all = backend.get_all().await?;
            let exported = match (&site, &tag) {
                (Some(url), Some(tag)) => store::export_tag(&all, url, tag)?,
                (Some(url), None) => store::export_site(&all, url)?,
                _ => store::export_all(&all),
            };
            let json = exported.to_json_pretty()?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("✔ 書き出しました: {} ({}サイト)", path.display(), exported.len());
                }
                None => println!("{}", json),
            }
        }

        Commands::Config { set_store, show, engine_json } => {
            if let Some(path) = set_store {
                config.set_store_path(path)?;
                println!("✔ ストアファイルを設定しました");
            }

            if show {
                println!("設定:");
                println!("  設定ファイル: {}", Config::config_path()?.display());
                println!("  ストア: {}", config.resolve_store_path(cli.store.as_deref())?.display());
                println!("  非表示までの待ち時間: {}ms", config.engine.hide_delay_ms);
                println!("  URL変化の待ち時間: {}ms", config.engine.url_change_debounce_ms);
                println!("  入力後のクリックまで: {}ms", config.engine.menu_close_delay_ms);
            }

            if engine_json {
                println!("{}", serde_json::to_string_pretty(&config.engine)?);
            }
        }
    }

    Ok(())
}

/// `-v` でデフォルトを debug に。RUST_LOG があればそちらを優先
fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn confirm(prompt: &str, yes: bool) -> Result<()> {
    if yes {
        return Ok(());
    }
    let accepted = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| FormFillError::Prompt(e.to_string()))?;
    if accepted {
        Ok(())
    } else {
        Err(FormFillError::Cancelled)
    }
}

fn require_store(backend: &JsonFileStore) -> Result<()> {
    if backend.exists() {
        Ok(())
    } else {
        Err(FormFillError::StoreFileNotFound(backend.path().display().to_string()))
    }
}
