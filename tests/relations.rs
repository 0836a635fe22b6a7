mod common;

use common::*;
use foodgram::{
    actions::{
        add_relation, cart_recipes, fetch_subscriptions, follow, is_in_relation, is_subscribed,
        remove_relation, shopping_list, unfollow,
    },
    error::ApiError,
    pagination::PageRequest,
    schema::{RelationKind, ShoppingListLine},
};

#[tokio::test]
async fn cart_add_twice_is_a_duplicate() {
    let db = test_pool().await;
    let author = user(&db, "author").await;
    let lunch = tag(&db, "lunch").await;
    let salt = ingredient(&db, "Salt", "g").await;
    let soup = recipe(&db, &author, "Soup", &[&lunch], &[(&salt, 5)]).await;

    let short = add_relation(RelationKind::ShoppingCart, author.id, soup.id, &db)
        .await
        .unwrap();
    assert_eq!(short.id, soup.id);
    assert_eq!(short.name, "Soup");

    let again = add_relation(RelationKind::ShoppingCart, author.id, soup.id, &db).await;
    match again {
        Err(ApiError::DuplicateRelation(message)) => {
            assert_eq!(message, format!("Recipe with id {} already in shopping cart", soup.id))
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(count(&db, "SELECT COUNT(*) FROM shopping_carts").await, 1);
    assert!(
        is_in_relation(RelationKind::ShoppingCart, soup.id, Some(author.id), &db)
            .await
            .unwrap()
    );
    assert!(
        !is_in_relation(RelationKind::Favorite, soup.id, Some(author.id), &db)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn relations_on_missing_targets() {
    let db = test_pool().await;
    let reader = user(&db, "reader").await;

    let result = add_relation(RelationKind::Favorite, reader.id, 404, &db).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));

    let result = remove_relation(RelationKind::Favorite, reader.id, 404, &db).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn favorites_and_cart_are_independent() {
    let db = test_pool().await;
    let author = user(&db, "author").await;
    let lunch = tag(&db, "lunch").await;
    let salt = ingredient(&db, "Salt", "g").await;
    let soup = recipe(&db, &author, "Soup", &[&lunch], &[(&salt, 5)]).await;

    add_relation(RelationKind::Favorite, author.id, soup.id, &db)
        .await
        .unwrap();
    add_relation(RelationKind::ShoppingCart, author.id, soup.id, &db)
        .await
        .unwrap();
    remove_relation(RelationKind::Favorite, author.id, soup.id, &db)
        .await
        .unwrap();

    assert!(
        !is_in_relation(RelationKind::Favorite, soup.id, Some(author.id), &db)
            .await
            .unwrap()
    );
    assert_eq!(cart_recipes(author.id, &db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn shopping_list_sums_amounts() {
    let db = test_pool().await;
    let author = user(&db, "author").await;
    let buyer = user(&db, "buyer").await;
    let lunch = tag(&db, "lunch").await;
    let salt = ingredient(&db, "Salt", "g").await;
    let water = ingredient(&db, "Water", "ml").await;
    let potato = ingredient(&db, "Potato", "pcs").await;

    let a = recipe(&db, &author, "A", &[&lunch], &[(&salt, 5), (&water, 500)]).await;
    let b = recipe(&db, &author, "B", &[&lunch], &[(&potato, 4), (&salt, 3)]).await;
    let c = recipe(&db, &author, "C", &[&lunch], &[(&salt, 100)]).await;

    // Insertion order must not matter.
    add_relation(RelationKind::ShoppingCart, buyer.id, b.id, &db)
        .await
        .unwrap();
    add_relation(RelationKind::ShoppingCart, buyer.id, a.id, &db)
        .await
        .unwrap();
    // Someone else's cart does not leak in.
    add_relation(RelationKind::ShoppingCart, author.id, c.id, &db)
        .await
        .unwrap();

    let lines = shopping_list(buyer.id, &db).await.unwrap();
    let line = |name: &str, unit: &str, total_amount: i64| ShoppingListLine {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
        total_amount,
    };
    assert_eq!(
        lines,
        vec![
            line("Potato", "pcs", 4),
            line("Salt", "g", 8),
            line("Water", "ml", 500),
        ]
    );

    assert!(shopping_list(user(&db, "empty").await.id, &db)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn follow_scenario() {
    let db = test_pool().await;
    let a = user(&db, "a").await;
    let b = user(&db, "b").await;

    let author = follow(a.id, b.id, &db).await.unwrap();
    assert_eq!(author.id, b.id);
    assert!(is_subscribed(Some(a.id), b.id, &db).await.unwrap());
    assert!(!is_subscribed(Some(b.id), a.id, &db).await.unwrap());
    assert!(!is_subscribed(None, b.id, &db).await.unwrap());

    assert!(matches!(
        follow(a.id, b.id, &db).await,
        Err(ApiError::DuplicateRelation(_))
    ));
    assert!(matches!(
        follow(a.id, a.id, &db).await,
        Err(ApiError::SelfFollow)
    ));
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM follows WHERE follower_id = author_id").await,
        0
    );

    unfollow(a.id, b.id, &db).await.unwrap();
    assert!(matches!(
        unfollow(a.id, b.id, &db).await,
        Err(ApiError::NotFound(_))
    ));

    assert!(matches!(
        follow(a.id, 9999, &db).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn subscriptions_cap_recipes() {
    let db = test_pool().await;
    let reader = user(&db, "reader").await;
    let anna = user(&db, "anna").await;
    let boris = user(&db, "boris").await;
    let lunch = tag(&db, "lunch").await;
    let salt = ingredient(&db, "Salt", "g").await;

    for n in 0..3 {
        recipe(&db, &anna, &format!("Anna {n}"), &[&lunch], &[(&salt, 1)]).await;
    }

    follow(reader.id, boris.id, &db).await.unwrap();
    follow(reader.id, anna.id, &db).await.unwrap();

    let page = fetch_subscriptions(reader.id, Some(2), PageRequest::new(None, None, 6, 100), &db)
        .await
        .unwrap();

    assert_eq!(page.count, 2);
    let first = &page.results[0];
    assert_eq!(first.author.username, "anna");
    assert!(first.author.is_subscribed);
    assert_eq!(first.recipes_count, 3);
    let names: Vec<&str> = first.recipes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Anna 2", "Anna 1"]);

    assert_eq!(page.results[1].author.username, "boris");
    assert_eq!(page.results[1].recipes_count, 0);

    let page = fetch_subscriptions(reader.id, None, PageRequest::new(None, None, 6, 100), &db)
        .await
        .unwrap();
    assert_eq!(page.results[0].recipes.len(), 3);
}
