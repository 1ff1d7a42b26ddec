use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rd_core::{
    Article, ArticleDetail, ArticlePage, ArticleQuery, ArticleStore, Category, CategoryCount,
    Error, GeneratedSummary, InsertOutcome, KeyInsights, RawArticle, Result, SourceCount, Summary,
    TrendingTopic,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::{StorageBackend, DEFAULT_DATABASE_URL};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        source TEXT NOT NULL,
        author TEXT,
        published_date TEXT,
        scraped_date TEXT NOT NULL,
        excerpt TEXT,
        full_text TEXT,
        image_url TEXT,
        read_time_minutes INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_categories (
        article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES categories(id),
        confidence_score REAL NOT NULL,
        PRIMARY KEY (article_id, category_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ai_summaries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        article_id INTEGER NOT NULL UNIQUE REFERENCES articles(id) ON DELETE CASCADE,
        summary TEXT NOT NULL,
        key_insights TEXT,
        generated_date TEXT NOT NULL,
        model_used TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trending_topics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        topic_name TEXT NOT NULL,
        mention_count INTEGER NOT NULL DEFAULT 1,
        date TEXT NOT NULL,
        related_articles TEXT NOT NULL DEFAULT '[]',
        UNIQUE (topic_name, date)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_date)",
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source)",
    "CREATE INDEX IF NOT EXISTS idx_trending_date ON trending_topics(date)",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SQLiteStorage {
    pool: SqlitePool,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be reachable at DATABASE_URL (default sqlite://robotics.db)"
    }

    async fn open(url: Option<&str>) -> Result<Self> {
        Self::connect(url.unwrap_or(DEFAULT_DATABASE_URL)).await
    }
}

impl SQLiteStorage {
    /// Connect to `url`, creating the database file and schema if needed.
    pub async fn connect(url: &str) -> Result<Self> {
        let url = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite://{}", url)
        };
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(db_error("Invalid database URL"))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        for category in Category::ALL {
            sqlx::query("INSERT OR IGNORE INTO categories (name, description) VALUES (?, ?)")
                .bind(category.name())
                .bind(category.description())
                .execute(&pool)
                .await
                .map_err(db_error("Failed to seed categories"))?;
        }

        tracing::debug!("Opened SQLite storage at {}", url);
        Ok(Self { pool })
    }

    async fn load_detail(&self, article: Article) -> Result<ArticleDetail> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT c.name FROM article_categories ac
            JOIN categories c ON c.id = ac.category_id
            WHERE ac.article_id = ?
            ORDER BY ac.rowid
            "#,
        )
        .bind(article.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load categories"))?;

        let summary = sqlx::query(
            r#"
            SELECT id, article_id, summary, key_insights, generated_date, model_used
            FROM ai_summaries WHERE article_id = ?
            "#,
        )
        .bind(article.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load summary"))?
        .map(|row| row_to_summary(&row))
        .transpose()?;

        Ok(ArticleDetail {
            article,
            categories: names.iter().filter_map(|n| Category::from_name(n)).collect(),
            summary,
        })
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| Error::Database(format!("Failed to read column {}: {}", name, e)))
}

/// Fixed-width RFC 3339 so that text comparison orders by time.
fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {}: {}", text, e)))
}

fn decode_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| Error::Database(format!("Failed to parse date {}: {}", text, e)))
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let published: Option<String> = column(row, "published_date")?;
    let scraped: String = column(row, "scraped_date")?;
    let read_time: i64 = column(row, "read_time_minutes")?;
    Ok(Article {
        id: column(row, "id")?,
        title: column(row, "title")?,
        url: column(row, "url")?,
        source: column(row, "source")?,
        author: column(row, "author")?,
        published_date: published.as_deref().map(decode_time).transpose()?,
        scraped_date: decode_time(&scraped)?,
        excerpt: column(row, "excerpt")?,
        full_text: column(row, "full_text")?,
        image_url: column(row, "image_url")?,
        read_time_minutes: read_time.max(0) as u32,
    })
}

fn row_to_summary(row: &SqliteRow) -> Result<Summary> {
    let insights: Option<String> = column(row, "key_insights")?;
    let generated: String = column(row, "generated_date")?;
    Ok(Summary {
        id: column(row, "id")?,
        article_id: column(row, "article_id")?,
        summary: column(row, "summary")?,
        key_insights: insights
            .as_deref()
            .map(serde_json::from_str::<KeyInsights>)
            .transpose()?,
        generated_date: decode_time(&generated)?,
        model_used: column(row, "model_used")?,
    })
}

fn row_to_topic(row: &SqliteRow) -> Result<TrendingTopic> {
    let date: String = column(row, "date")?;
    let related: String = column(row, "related_articles")?;
    let mentions: i64 = column(row, "mention_count")?;
    Ok(TrendingTopic {
        id: column(row, "id")?,
        topic_name: column(row, "topic_name")?,
        mention_count: mentions.max(0) as u32,
        date: decode_date(&date)?,
        related_articles: serde_json::from_str(&related)?,
    })
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ArticleQuery) {
    builder.push(" WHERE 1 = 1");
    if let Some(category) = &query.category {
        builder
            .push(
                " AND a.id IN (SELECT ac.article_id FROM article_categories ac \
                 JOIN categories c ON c.id = ac.category_id WHERE c.name = ",
            )
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(source) = &query.source {
        builder.push(" AND a.source = ").push_bind(source.clone());
    }
    if let Some(from) = query.date_from {
        builder
            .push(" AND a.published_date >= ")
            .push_bind(encode_time(from));
    }
    if let Some(to) = query.date_to {
        builder
            .push(" AND a.published_date <= ")
            .push_bind(encode_time(to));
    }
    if let Some(term) = query.search_term() {
        let pattern = format!("%{}%", term);
        builder
            .push(" AND (a.title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.excerpt LIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM ai_summaries s WHERE s.article_id = a.id AND s.summary LIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn find_by_url(&self, url: &str) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to look up article"))
    }

    async fn insert_article(&self, raw: &RawArticle) -> Result<InsertOutcome> {
        let scraped = Utc::now().trunc_subsecs(6);
        let mut article = Article::from_raw(0, raw, scraped);

        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (title, url, source, author, published_date, scraped_date,
             excerpt, full_text, image_url, read_time_minutes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.source)
        .bind(article.author.as_deref())
        .bind(article.published_date.map(encode_time))
        .bind(encode_time(article.scraped_date))
        .bind(article.excerpt.as_deref())
        .bind(article.full_text.as_deref())
        .bind(article.image_url.as_deref())
        .bind(article.read_time_minutes as i64)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store article"))?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::AlreadyExists);
        }
        article.id = result.last_insert_rowid();
        Ok(InsertOutcome::Inserted(article))
    }

    async fn attach_category(&self, article_id: i64, category: Category, confidence: f32) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO article_categories (article_id, category_id, confidence_score)
            SELECT ?, id, ? FROM categories WHERE name = ?
            "#,
        )
        .bind(article_id)
        .bind(confidence.clamp(0.0, 1.0) as f64)
        .bind(category.name())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to attach category"))?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(format!("Category {} is not seeded", category)));
        }
        Ok(())
    }

    async fn insert_summary(&self, article_id: i64, summary: &GeneratedSummary) -> Result<()> {
        let insights = summary
            .key_insights
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO ai_summaries (article_id, summary, key_insights, generated_date, model_used)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(article_id) DO NOTHING
            "#,
        )
        .bind(article_id)
        .bind(&summary.text)
        .bind(insights)
        .bind(encode_time(Utc::now()))
        .bind(&summary.model_used)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store summary"))?;
        Ok(())
    }

    async fn upsert_trending(&self, topic: &str, article_id: i64, date: NaiveDate) -> Result<()> {
        let day = date.format(DATE_FORMAT).to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let existing: Option<(i64, String)> = sqlx::query_as(
            "SELECT id, related_articles FROM trending_topics WHERE topic_name = ? AND date = ?",
        )
        .bind(topic)
        .bind(&day)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to read trending topic"))?;

        match existing {
            Some((id, related)) => {
                let mut related: Vec<i64> = serde_json::from_str(&related)?;
                if !related.contains(&article_id) {
                    related.push(article_id);
                }
                sqlx::query(
                    r#"
                    UPDATE trending_topics
                    SET mention_count = mention_count + 1, related_articles = ?
                    WHERE id = ?
                    "#,
                )
                .bind(serde_json::to_string(&related)?)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to update trending topic"))?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO trending_topics (topic_name, mention_count, date, related_articles)
                    VALUES (?, 1, ?, ?)
                    "#,
                )
                .bind(topic)
                .bind(&day)
                .bind(serde_json::to_string(&[article_id])?)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to insert trending topic"))?;
            }
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit trending topic"))
    }

    async fn get_article(&self, id: i64) -> Result<Option<ArticleDetail>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get article"))?;

        match row {
            Some(row) => {
                let article = row_to_article(&row)?;
                Ok(Some(self.load_detail(article).await?))
            }
            None => Ok(None),
        }
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM articles a");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count articles"))?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT a.* FROM articles a");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY a.published_date IS NULL, a.published_date DESC, a.id DESC")
            .push(" LIMIT ")
            .push_bind(query.limit() as i64)
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list articles"))?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            let article = row_to_article(&row)?;
            articles.push(self.load_detail(article).await?);
        }
        Ok(ArticlePage::new(articles, total.max(0) as u64, query))
    }

    async fn trending_topics(&self, since: NaiveDate, limit: usize) -> Result<Vec<TrendingTopic>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM trending_topics
            WHERE date >= ?
            ORDER BY mention_count DESC, topic_name ASC
            LIMIT ?
            "#,
        )
        .bind(since.format(DATE_FORMAT).to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load trending topics"))?;

        rows.iter().map(row_to_topic).collect()
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT c.name, COUNT(ac.article_id)
            FROM categories c
            LEFT JOIN article_categories ac ON ac.category_id = c.id
            GROUP BY c.id
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to count categories"))?;

        Ok(rows
            .into_iter()
            .filter_map(|(name, count)| {
                Category::from_name(&name).map(|category| CategoryCount {
                    category,
                    description: category.description().to_string(),
                    article_count: count.max(0) as u64,
                })
            })
            .collect())
    }

    async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT source, COUNT(*) FROM articles GROUP BY source ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to count sources"))?;

        Ok(rows
            .into_iter()
            .map(|(source, count)| SourceCount {
                source,
                article_count: count.max(0) as u64,
            })
            .collect())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM articles WHERE scraped_date < ?")
            .bind(encode_time(cutoff))
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete old articles"))?;
        Ok(result.rows_affected())
    }
}
