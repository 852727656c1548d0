use log::debug;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeSet;

use crate::model::{slugify, Tag};

/// The join table linking one item table to `tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagLinks {
    pub join_table: &'static str,
    pub item_column: &'static str,
}

impl TagLinks {
    pub const fn new(join_table: &'static str, item_column: &'static str) -> Self {
        Self {
            join_table,
            item_column,
        }
    }
}

pub const BOOKMARK_TAGS: TagLinks = TagLinks::new("pinboard_bookmark_tag", "bookmark_id");
pub const PHOTO_TAGS: TagLinks = TagLinks::new("flickr_photo_tag", "photo_id");

pub async fn tag_id(conn: &mut SqliteConnection, name: &str) -> Result<i64, sqlx::Error> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM tag WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let slug = free_slug(conn, name).await?;
    debug!("new tag {:?} ({})", name, slug);
    Ok(sqlx::query("INSERT INTO tag (name, slug) VALUES (?, ?)")
        .bind(name)
        .bind(slug)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid())
}

/// The name's slug, with `-2`, `-3`, ... appended while another tag holds it.
async fn free_slug(conn: &mut SqliteConnection, name: &str) -> Result<String, sqlx::Error> {
    let base = match slugify(name) {
        s if s.is_empty() => "tag".to_string(),
        s => s,
    };
    let mut slug = base.clone();
    let mut n = 2;
    loop {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tag WHERE slug = ?)")
            .bind(&slug)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            return Ok(slug);
        }
        slug = format!("{base}-{n}");
        n += 1;
    }
}

/// Make the item's tags exactly `names`. Returns whether anything changed.
pub async fn sync_tags(
    conn: &mut SqliteConnection,
    links: &TagLinks,
    item_id: i64,
    names: &[String],
) -> Result<bool, sqlx::Error> {
    let mut wanted = BTreeSet::new();
    for name in names.iter().filter(|n| !n.is_empty()) {
        wanted.insert(tag_id(conn, name).await?);
    }
    let existing: BTreeSet<i64> = sqlx::query_scalar(&format!(
        "SELECT tag_id FROM {} WHERE {} = ?",
        links.join_table, links.item_column
    ))
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();
    if wanted == existing {
        return Ok(false);
    }

    debug!(
        "{}: retagging {} ({} -> {} tags)",
        links.join_table,
        item_id,
        existing.len(),
        wanted.len()
    );
    for id in existing.difference(&wanted) {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = ? AND tag_id = ?",
            links.join_table, links.item_column
        ))
        .bind(item_id)
        .bind(*id)
        .execute(&mut *conn)
        .await?;
    }
    for id in wanted.difference(&existing) {
        sqlx::query(&format!(
            "INSERT INTO {} ({}, tag_id) VALUES (?, ?)",
            links.join_table, links.item_column
        ))
        .bind(item_id)
        .bind(*id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(true)
}

pub async fn tags_for_item(
    db: &SqlitePool,
    links: &TagLinks,
    item_id: i64,
) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT tag.id, tag.name, tag.slug FROM tag
        JOIN {} l ON l.tag_id = tag.id
        WHERE l.{} = ?
        ORDER BY tag.name",
        links.join_table, links.item_column
    ))
    .bind(item_id)
    .fetch_all(db)
    .await
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagCount {
    pub tag: Tag,
    pub count: i64,
}

/// Tags in use across all tagged items, private ones left out, most used first.
pub async fn public_tags(db: &SqlitePool) -> Result<Vec<TagCount>, sqlx::Error> {
    let rows: Vec<(i64, String, String, i64)> = sqlx::query_as(
        "SELECT tag.id, tag.name, tag.slug, COUNT(*) AS uses FROM tag
        JOIN (
            SELECT tag_id FROM pinboard_bookmark_tag
            UNION ALL
            SELECT tag_id FROM flickr_photo_tag
        ) l ON l.tag_id = tag.id
        GROUP BY tag.id
        ORDER BY uses DESC, tag.name",
    )
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name, slug, count)| TagCount {
            tag: Tag { id, name, slug },
            count,
        })
        .filter(|t| !t.tag.is_private())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect;

    async fn item(conn: &mut SqliteConnection, hash: &str) -> i64 {
        sqlx::query(
            "INSERT INTO account (service, username, is_active, time_created, time_modified)
            VALUES ('pinboard', ?, 1, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')
            ON CONFLICT (service, username) DO NOTHING",
        )
        .bind("phil")
        .execute(&mut *conn)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO pinboard_bookmark (account_id, url_hash, url, raw, fetch_time)
            VALUES (1, ?, 'https://example.com/', '{}', '2024-01-01T00:00:00Z')",
        )
        .bind(hash)
        .execute(&mut *conn)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn sync_reports_changes() {
        let db = connect("sqlite::memory:").await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let id = item(&mut conn, "a").await;

        assert!(sync_tags(&mut conn, &BOOKMARK_TAGS, id, &names(&["rust", "web"]))
            .await
            .unwrap());
        assert!(!sync_tags(&mut conn, &BOOKMARK_TAGS, id, &names(&["web", "rust", "rust"]))
            .await
            .unwrap());
        assert!(sync_tags(&mut conn, &BOOKMARK_TAGS, id, &names(&["web"]))
            .await
            .unwrap());
        drop(conn);

        let tags = tags_for_item(&db, &BOOKMARK_TAGS, id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "web");
    }

    #[tokio::test]
    async fn colliding_slugs_get_a_suffix() {
        let db = connect("sqlite::memory:").await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let first = tag_id(&mut conn, "Web Dev").await.unwrap();
        let second = tag_id(&mut conn, "web-dev").await.unwrap();
        let third = tag_id(&mut conn, "web dev!").await.unwrap();
        let symbols = tag_id(&mut conn, "???").await.unwrap();
        assert_eq!(tag_id(&mut conn, "web-dev").await.unwrap(), second);

        let mut slugs = Vec::new();
        for id in [first, second, third, symbols] {
            let slug: String = sqlx::query_scalar("SELECT slug FROM tag WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *conn)
                .await
                .unwrap();
            slugs.push(slug);
        }
        assert_eq!(slugs, vec!["web-dev", "web-dev-2", "web-dev-3", "tag"]);
    }

    #[tokio::test]
    async fn public_listing_skips_private_tags() {
        let db = connect("sqlite::memory:").await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let a = item(&mut conn, "a").await;
        let b = item(&mut conn, "b").await;
        sync_tags(&mut conn, &BOOKMARK_TAGS, a, &names(&["rust", ".todo"]))
            .await
            .unwrap();
        sync_tags(&mut conn, &BOOKMARK_TAGS, b, &names(&["rust", "Web Dev"]))
            .await
            .unwrap();
        drop(conn);

        let tags = public_tags(&db).await.unwrap();
        let listed: Vec<(&str, i64)> = tags.iter().map(|t| (t.tag.name.as_str(), t.count)).collect();
        assert_eq!(listed, vec![("rust", 2), ("Web Dev", 1)]);
        assert_eq!(tags[1].tag.slug, "web-dev");
    }
}
