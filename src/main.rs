use std::io::{self, Write};
use std::sync::Arc;

use movie_browser_backend::external::{ImageSize, TmdbClient};
use movie_browser_backend::models::MovieListType;
use movie_browser_backend::services::{BrowseSession, BrowseView, MemoryQueryStore};

/// 演示程序：用真实的 TMDB 接口跑一遍浏览会话
///
/// 需要环境变量 TMDB_API_KEY
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_key = std::env::var("TMDB_API_KEY")
        .map_err(|_| anyhow::anyhow!("环境变量 TMDB_API_KEY 未设置"))?;

    let client = TmdbClient::new(api_key);
    let list_type = MovieListType::Popular;
    let session = BrowseSession::new(
        Arc::new(client.clone()),
        MemoryQueryStore::new(),
        BrowseView::List(list_type),
    );

    session.sync().await;
    if let Some(err) = session.error().await {
        return Err(anyhow::anyhow!("加载失败: {}", err));
    }

    print_movies(&session, list_type.label()).await?;

    if let Some(first) = session.movies().await.first() {
        if let Some(poster) = &first.poster_path {
            println!("首部影片海报: {}", client.build_image_url(poster, ImageSize::W500));
        }
    }

    // 翻一页
    session.load_more().await?;
    print_movies(&session, "Popular (第 2 页之后)").await?;

    // 切到发现视图，按类型筛选并换排序
    session.set_view(BrowseView::Discover).await;
    session.set_selected_genres(&[28]).await;
    session.set_selected_sort("vote_average.desc").await;
    print_movies(&session, "Discover: Action, 按评分降序").await?;

    let genres = session.genres().await;
    println!("共 {} 个类型可用", genres.len());

    Ok(())
}

async fn print_movies(
    session: &BrowseSession<MemoryQueryStore>,
    heading: &str,
) -> io::Result<()> {
    let movies = session.movies().await;
    let snapshot = session.snapshot().await;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "== {} ({} / {} 条) ==", heading, movies.len(), snapshot.total_results)?;
    for movie in movies.iter().take(10) {
        writeln!(
            out,
            "  [{}] {} ({})",
            movie.id,
            movie.title,
            movie.release_date.as_deref().unwrap_or("未知日期")
        )?;
    }
    Ok(())
}
