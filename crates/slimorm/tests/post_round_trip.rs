//! A single model through insert, read, update and delete.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use slimorm::prelude::*;

#[derive(Debug, Default, Clone, PartialEq, Model)]
struct Post {
    #[orm(primary_key, auto_increment, alias = "Id")]
    id: i64,
    #[orm(alias = "Title")]
    title: String,
    #[orm(alias = "Views")]
    views: i32,
}

#[test]
fn post_round_trip() {
    let mut conn = OrmConnectionFactory::new(":memory:", Arc::new(SqliteDriver))
        .dialect(Arc::new(SqliteDialect::new()))
        .open_db_connection()
        .unwrap();
    conn.create_table::<Post>(false).unwrap();

    let inserted = conn
        .insert(&Post {
            title: "Hello".into(),
            views: 0,
            ..Post::default()
        })
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(conn.last_insert_id().unwrap(), 1);

    let mut post = conn.get_by_id_or_default::<Post>(1_i64).unwrap().unwrap();
    assert_eq!(
        post,
        Post {
            id: 1,
            title: "Hello".into(),
            views: 0,
        }
    );

    post.title = "Hi".into();
    assert_eq!(conn.update(&post).unwrap(), 1);
    let reread = conn.get_by_id_or_default::<Post>(1_i64).unwrap().unwrap();
    assert_eq!(reread.title, "Hi");
    assert_eq!(reread.views, 0);

    assert_eq!(conn.delete(&reread).unwrap(), 1);
    assert_eq!(conn.get_by_id_or_default::<Post>(1_i64).unwrap(), None);
    assert!(matches!(
        conn.get_by_id::<Post>(1_i64),
        Err(Error::NotFound { .. })
    ));
}
