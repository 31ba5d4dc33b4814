use anyhow::Result;
use member_query::core::bulk::{DeleteClause, UpdateClause};
use member_query::core::expr::Selection;
use member_query::domain::model::{MemberDto, NewMember, UserDto};
use member_query::{
    member, team, CaseBuilder, Expr, FixtureConfig, InMemoryStore, MemberQuery, MemberStore,
    QueryError, QueryFactory, SubQuery, Value,
};

async fn seeded_factory() -> Result<QueryFactory<InMemoryStore>> {
    let store = InMemoryStore::new();
    FixtureConfig::default().seed(&store).await?;
    Ok(QueryFactory::new(store))
}

fn names(members: &[member_query::core::Member]) -> Vec<&str> {
    members.iter().map(|m| m.username.as_str()).collect()
}

#[tokio::test]
async fn test_paging() -> Result<()> {
    let factory = seeded_factory().await?;
    let query = MemberQuery::new()
        .order_by(member::username().desc())
        .offset(1)
        .limit(2);

    let page = factory.fetch(&query).await?;
    assert_eq!(names(&page), vec!["member3", "member2"]);

    let results = factory.fetch_results(&query).await?;
    assert_eq!(results.total, 4);
    assert_eq!(results.limit, Some(2));
    assert_eq!(results.offset, 1);
    assert_eq!(results.results.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_aggregation() -> Result<()> {
    let factory = seeded_factory().await?;
    let tuples = factory
        .fetch_tuples(
            &MemberQuery::new(),
            vec![
                member::count().into(),
                member::age().sum().into(),
                member::age().avg().into(),
                member::age().max().into(),
                member::age().min().into(),
            ],
        )
        .await?;

    assert_eq!(tuples.len(), 1);
    let tuple = &tuples[0];
    assert_eq!(tuple.get("count(member)"), Some(&Value::Int(4)));
    assert_eq!(tuple.get("sum(member.age)"), Some(&Value::Int(100)));
    assert_eq!(tuple.get("avg(member.age)"), Some(&Value::Float(25.0)));
    assert_eq!(tuple.get("max(member.age)"), Some(&Value::Int(40)));
    assert_eq!(tuple.get("min(member.age)"), Some(&Value::Int(10)));
    Ok(())
}

#[tokio::test]
async fn test_group_by_team() -> Result<()> {
    let factory = seeded_factory().await?;
    let query = MemberQuery::new().join_team().group_by(team::name());
    let tuples = factory
        .fetch_tuples(&query, vec![team::name().into(), member::age().avg().into()])
        .await?;

    assert_eq!(tuples.len(), 2);
    assert_eq!(tuples[0].get("name"), Some(&Value::from("teamA")));
    assert_eq!(tuples[0].get_at(1), Some(&Value::Float(15.0)));
    assert_eq!(tuples[1].get("name"), Some(&Value::from("teamB")));
    assert_eq!(tuples[1].get_at(1), Some(&Value::Float(35.0)));
    Ok(())
}

#[tokio::test]
async fn test_join_filters_by_team() -> Result<()> {
    let factory = seeded_factory().await?;
    let query = MemberQuery::new()
        .join_team()
        .where_(team::name().eq("teamA"));

    assert_eq!(names(&factory.fetch(&query).await?), vec!["member1", "member2"]);
    Ok(())
}

#[tokio::test]
async fn test_theta_join() -> Result<()> {
    let factory = seeded_factory().await?;
    factory.store().persist_member(NewMember::named("teamA")).await?;
    factory.store().persist_member(NewMember::named("teamB")).await?;

    let query = MemberQuery::new()
        .theta_team()
        .where_(member::username().eq(team::name()));

    assert_eq!(names(&factory.fetch(&query).await?), vec!["teamA", "teamB"]);
    Ok(())
}

#[tokio::test]
async fn test_left_join_on_filtering() -> Result<()> {
    let factory = seeded_factory().await?;
    let query = MemberQuery::new()
        .left_join_team()
        .on(team::name().eq("teamA"));

    let pairs = factory.fetch_pairs(&query).await?;
    assert_eq!(pairs.len(), 4);
    let teams: Vec<Option<&str>> = pairs
        .iter()
        .map(|(_, t)| t.as_ref().map(|t| t.name.as_str()))
        .collect();
    assert_eq!(teams, vec![Some("teamA"), Some("teamA"), None, None]);
    Ok(())
}

#[tokio::test]
async fn test_left_join_without_relation() -> Result<()> {
    let factory = seeded_factory().await?;
    factory.store().persist_member(NewMember::named("teamA")).await?;
    factory.store().persist_member(NewMember::named("teamB")).await?;

    let query = MemberQuery::new()
        .left_join_unrelated_team()
        .on(member::username().eq(team::name()));

    let pairs = factory.fetch_pairs(&query).await?;
    assert_eq!(pairs.len(), 6);
    let joined: Vec<(&str, &str)> = pairs
        .iter()
        .filter_map(|(m, t)| t.as_ref().map(|t| (m.username.as_str(), t.name.as_str())))
        .collect();
    assert_eq!(joined, vec![("teamA", "teamA"), ("teamB", "teamB")]);
    Ok(())
}

#[tokio::test]
async fn test_fetch_join_loads_team() -> Result<()> {
    let factory = seeded_factory().await?;

    let plain = MemberQuery::new().where_(member::username().eq("member1"));
    let found = factory.fetch_one(&plain).await?.expect("member1");
    assert!(!found.team.is_loaded());

    let fetched = MemberQuery::new()
        .join_team()
        .fetch_join()
        .where_(member::username().eq("member1"));
    let found = factory.fetch_one(&fetched).await?.expect("member1");
    assert!(found.team.is_loaded());
    assert_eq!(found.team.loaded().map(|t| t.name.as_str()), Some("teamA"));
    Ok(())
}

#[tokio::test]
async fn test_fetch_one_with_many_results_fails() -> Result<()> {
    let factory = seeded_factory().await?;
    let err = factory.fetch_one(&MemberQuery::new()).await.unwrap_err();
    assert!(matches!(err, QueryError::NonUniqueResult { count: 4 }));
    Ok(())
}

#[tokio::test]
async fn test_subqueries() -> Result<()> {
    let factory = seeded_factory().await?;
    let ages = |members: Vec<member_query::core::Member>| -> Vec<i64> {
        members.into_iter().map(|m| m.age).collect()
    };

    let oldest = MemberQuery::new().where_(member::age().eq(SubQuery::select(member::age().max())));
    assert_eq!(ages(factory.fetch(&oldest).await?), vec![40]);

    let above_average =
        MemberQuery::new().where_(member::age().goe(SubQuery::select(member::age().avg())));
    assert_eq!(ages(factory.fetch(&above_average).await?), vec![30, 40]);

    let in_older = MemberQuery::new().where_(
        member::age().in_subquery(SubQuery::select(member::age()).where_(member::age().gt(10))),
    );
    assert_eq!(ages(factory.fetch(&in_older).await?), vec![20, 30, 40]);
    Ok(())
}

#[tokio::test]
async fn test_select_subquery() -> Result<()> {
    let factory = seeded_factory().await?;
    let tuples = factory
        .fetch_tuples(
            &MemberQuery::new(),
            vec![
                member::username().into(),
                SubQuery::select(member::age().avg()).as_("avg_age"),
            ],
        )
        .await?;

    assert_eq!(tuples.len(), 4);
    assert!(tuples
        .iter()
        .all(|t| t.get("avg_age") == Some(&Value::Float(25.0))));
    Ok(())
}

#[tokio::test]
async fn test_case_expressions() -> Result<()> {
    let factory = seeded_factory().await?;

    let simple = member::age()
        .when(10)
        .then("ten")
        .when(20)
        .then("twenty")
        .otherwise("other");
    let values = factory.fetch_values(&MemberQuery::new(), simple).await?;
    assert_eq!(
        values,
        vec![
            Value::from("ten"),
            Value::from("twenty"),
            Value::from("other"),
            Value::from("other"),
        ]
    );

    let searched = CaseBuilder::new()
        .when(member::age().between(0, 20))
        .then("0-20")
        .when(member::age().between(21, 30))
        .then("21-30")
        .otherwise("other");
    let values = factory.fetch_values(&MemberQuery::new(), searched).await?;
    assert_eq!(values[1], Value::from("0-20"));
    assert_eq!(values[2], Value::from("21-30"));
    assert_eq!(values[3], Value::from("other"));
    Ok(())
}

#[tokio::test]
async fn test_constant_and_concat() -> Result<()> {
    let factory = seeded_factory().await?;

    let tuples = factory
        .fetch_tuples(
            &MemberQuery::new(),
            vec![member::username().into(), Expr::constant("A").as_("constant")],
        )
        .await?;
    assert!(tuples.iter().all(|t| t.get("constant") == Some(&Value::from("A"))));

    let query = MemberQuery::new().where_(member::username().eq("member1"));
    let concat = member::username().concat("_").concat(member::age().string_value());
    let values = factory.fetch_values(&query, concat).await?;
    assert_eq!(values, vec![Value::from("member1_10")]);
    Ok(())
}

#[tokio::test]
async fn test_dto_projections() -> Result<()> {
    let factory = seeded_factory().await?;
    let columns = || -> Vec<Selection> { vec![member::username().into(), member::age().into()] };

    let by_field: Vec<MemberDto> = factory.fetch_fields(&MemberQuery::new(), columns()).await?;
    let by_constructor: Vec<MemberDto> = factory
        .fetch_constructed(&MemberQuery::new(), columns())
        .await?;
    assert_eq!(by_field, by_constructor);
    assert_eq!(
        by_field[0],
        MemberDto {
            username: "member1".to_string(),
            age: 10
        }
    );

    let users: Vec<UserDto> = factory
        .fetch_fields(
            &MemberQuery::new(),
            vec![
                member::username().as_("name"),
                SubQuery::select(member::age().max()).as_("age"),
            ],
        )
        .await?;
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u.age == 40));
    assert_eq!(users[3].name, "member4");
    Ok(())
}

#[tokio::test]
async fn test_bulk_update_and_delete() -> Result<()> {
    let factory = seeded_factory().await?;

    let renamed = factory
        .execute_update(
            &UpdateClause::new()
                .set(member::username(), "non-member")
                .where_(member::age().lt(28)),
        )
        .await?;
    assert_eq!(renamed, 2);
    let all = factory.fetch(&MemberQuery::new()).await?;
    assert_eq!(
        names(&all),
        vec!["non-member", "non-member", "member3", "member4"]
    );

    let aged = factory
        .execute_update(&UpdateClause::new().set(member::age(), member::age().add(1)))
        .await?;
    assert_eq!(aged, 4);

    let deleted = factory
        .execute_delete(&DeleteClause::new().where_(member::age().gt(18)))
        .await?;
    assert_eq!(deleted, 3);
    let remaining = factory.fetch(&MemberQuery::new()).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].age, 11);
    Ok(())
}

#[tokio::test]
async fn test_sql_functions() -> Result<()> {
    let factory = seeded_factory().await?;

    let replaced = Expr::function(
        "replace",
        vec![member::username(), Expr::constant("member"), Expr::constant("M")],
    );
    let values = factory.fetch_values(&MemberQuery::new(), replaced).await?;
    assert_eq!(values[0], Value::from("M1"));

    let lower_equal = MemberQuery::new().where_(member::username().eq(member::username().lower()));
    assert_eq!(factory.fetch(&lower_equal).await?.len(), 4);

    let unknown = Expr::function("soundex", vec![member::username()]);
    let err = factory
        .fetch_values(&MemberQuery::new(), unknown)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::UnknownFunction { .. }));
    Ok(())
}

#[tokio::test]
async fn test_store_is_shared_with_factory() -> Result<()> {
    let store = InMemoryStore::new();
    let factory = QueryFactory::new(store.clone());
    let team_c = store.persist_team("teamC").await?;
    store
        .persist_member(NewMember::new("member9", 90, Some(team_c.id)))
        .await?;

    let members = factory
        .fetch(&MemberQuery::new().join_team().where_(team::name().eq("teamC")))
        .await?;
    assert_eq!(names(&members), vec!["member9"]);
    Ok(())
}

#[tokio::test]
async fn test_overflowing_update_fails_and_changes_nothing() -> Result<()> {
    let factory = seeded_factory().await?;
    let err = factory
        .execute_update(&UpdateClause::new().set(member::age(), member::age().add(i64::MAX)))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));

    let ages: Vec<i64> = factory
        .fetch(&MemberQuery::new())
        .await?
        .into_iter()
        .map(|m| m.age)
        .collect();
    assert_eq!(ages, vec![10, 20, 30, 40]);
    Ok(())
}

#[tokio::test]
async fn test_negated_filter_on_missing_team_matches_nothing() -> Result<()> {
    let factory = seeded_factory().await?;
    let query = MemberQuery::new()
        .left_join_team()
        .on(team::name().eq("teamA"))
        .where_(team::name().eq("teamA").not());

    assert!(factory.fetch(&query).await?.is_empty());

    let unmatched = MemberQuery::new()
        .left_join_team()
        .on(team::name().eq("teamA"))
        .where_(team::name().is_null());
    assert_eq!(
        names(&factory.fetch(&unmatched).await?),
        vec!["member3", "member4"]
    );
    Ok(())
}
