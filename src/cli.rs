use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formfill")]
#[command(about = "フォーム入力テストデータの保存・照合ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// ストアファイル（拡張機能のエクスポートJSON）
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// URLと入力数から候補を探す
    Matches {
        /// 現在のページのURL
        #[arg(required = true)]
        url: String,

        /// 現在のページの入力要素数
        #[arg(short, long, default_value = "0")]
        count: usize,
    },

    /// テストデータのあるサイトを一覧表示
    List {
        /// タイトル/URLで絞り込み
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// サイトのタグと値を表示
    Show {
        #[arg(required = true)]
        url: String,

        /// 表示するタグ（省略時は全タグ）
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// サイト数・タグ数を表示
    Stats,

    /// タグを削除（最後のタグならサイトごと削除）
    DeleteTag {
        #[arg(required = true)]
        url: String,

        #[arg(required = true)]
        tag: String,

        /// 確認しない
        #[arg(short, long)]
        yes: bool,
    },

    /// サイトのデータを全て削除
    DeleteSite {
        #[arg(required = true)]
        url: String,

        /// 確認しない
        #[arg(short, long)]
        yes: bool,
    },

    /// タグを別のサイトへ複製
    CopyTag {
        /// 複製元URL
        #[arg(required = true)]
        from: String,

        #[arg(required = true)]
        tag: String,

        /// 複製先URL（既存のサイトのみ）
        #[arg(required = true)]
        to: String,

        /// 同名タグを確認なしで上書き
        #[arg(short, long)]
        yes: bool,
    },

    /// JSONファイルを読み込む（既存データは全て置き換え）
    Import {
        #[arg(required = true)]
        input: PathBuf,

        /// 確認しない
        #[arg(short, long)]
        yes: bool,
    },

    /// JSONファイルへ書き出す
    Export {
        /// 出力ファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 1サイトのみ
        #[arg(long)]
        site: Option<String>,

        /// 1タグのみ（--site と併用）
        #[arg(long, requires = "site")]
        tag: Option<String>,
    },

    /// 設定の表示・変更
    Config {
        /// ストアファイルのパスを設定
        #[arg(long)]
        set_store: Option<PathBuf>,

        /// 現在の設定を表示
        #[arg(long)]
        show: bool,

        /// エンジン設定をJSONで出力（拡張機能の configure に渡す）
        #[arg(long)]
        engine_json: bool,
    },
}
