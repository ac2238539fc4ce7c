//! # Core Service サーバー
//!
//! 人事・研修バックオフィスの承認ワークフローを処理する内部サービス。
//!
//! - **申請**: 休暇・残業・打刻修正・書類の申請受付と取り消し
//! - **決裁**: 承認チェーンに沿った承認・却下、委任による代理決裁
//! - **設定**: 承認ワークフローと委任の管理
//!
//! 操作者は上流ゲートウェイが付与する `x-user-id` / `x-user-capabilities` ヘッダーで識別する。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `HR_APPROVER_ROLE` | No | `hr` 承認者として解決するロール名（デフォルト: `hr`） |
//! | `RUN_MIGRATIONS` | No | 起動時にマイグレーションを適用するか（デフォルト: `true`） |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! CORE_PORT=3001 DATABASE_URL=postgres://... cargo run -p validflow-core-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use validflow_core_service::{
   app::{AppDependencies, build_app},
   config::CoreConfig,
};
use validflow_domain::clock::SystemClock;
use validflow_infra::{
   db::{self, PgTransactionManager},
   repository::{
      PostgresDelegationRepository,
      PostgresOrgDirectory,
      PostgresRequestRepository,
      PostgresValidationWorkflowRepository,
   },
};
use validflow_shared::observability::{TracingConfig, init_tracing};

/// Core Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
   // .env ファイルを読み込む（存在する場合）
   dotenvy::dotenv().ok();

   // トレーシング初期化
   init_tracing(TracingConfig::from_env("core-service"));

   // 設定読み込み
   let config = CoreConfig::from_env()?;

   tracing::info!(
      "Core Service サーバーを起動します: {}:{}",
      config.host,
      config.port
   );

   // データベース接続プールを作成
   let pool = db::create_pool(&config.database_url).await?;
   tracing::info!("データベースに接続しました");

   if config.run_migrations {
      db::run_migrations(&pool).await?;
      tracing::info!("マイグレーションを適用しました");
   }

   // 依存コンポーネントを初期化
   let deps = AppDependencies {
      request_repo:    Arc::new(PostgresRequestRepository::new(pool.clone())),
      workflow_repo:   Arc::new(PostgresValidationWorkflowRepository::new(pool.clone())),
      delegation_repo: Arc::new(PostgresDelegationRepository::new(pool.clone())),
      org_directory:   Arc::new(PostgresOrgDirectory::new(pool.clone())),
      tx_manager:      Arc::new(PgTransactionManager::new(pool)),
      clock:           Arc::new(SystemClock),
      hr_role:         config.hr_role.clone(),
   };

   // ルーター構築
   let app = build_app(deps).layer(TraceLayer::new_for_http());

   // サーバー起動
   let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
   let listener = TcpListener::bind(addr).await?;
   tracing::info!("Core Service サーバーが起動しました: {}", addr);

   axum::serve(listener, app).await?;

   Ok(())
}
