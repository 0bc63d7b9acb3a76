//! End-to-end reversion tests over real SQLite repositories
//!
//! The unit tests in the revert module cover the computation against
//! fakes; these exercise the same scenarios through the SQLite match,
//! rating, and audit stores.

mod common;

use common::{deployment, rating_of, seed_duel, seed_stats};
use mgeops_common::SteamId64;
use mgeops_wi::repo::AuditLog;
use mgeops_wi::revert::{Actor, ReversionEngine, Selection};

const TARGET_64: &str = "76561198012345678";
const OPPONENT_64: &str = "76561198087654321";

fn steam2(id64: &str) -> String {
    SteamId64::parse(id64).unwrap().steam2_canonical().unwrap()
}

#[tokio::test]
async fn test_preview_then_apply_two_wins() {
    let deployment = deployment(None).await;
    let region = deployment.state.regions.get("ar").unwrap();

    let target2 = steam2(TARGET_64);
    let opp2 = steam2(OPPONENT_64);
    seed_duel(
        &deployment.ar_pool,
        &target2,
        &opp2,
        Some((1500, 1520)),
        Some((1480, 1460)),
        1_700_000_100,
    )
    .await;
    seed_duel(
        &deployment.ar_pool,
        &target2,
        &opp2,
        Some((1520, 1545)),
        Some((1460, 1440)),
        1_700_000_200,
    )
    .await;
    seed_stats(&deployment.ar_pool, &target2, 1545).await;
    seed_stats(&deployment.ar_pool, &opp2, 1440).await;

    let engine = ReversionEngine::new(
        &region.matches,
        &region.ratings,
        &deployment.state.audit,
        1600,
    );

    let summary = engine
        .preview("ar", TARGET_64, &Selection::default())
        .await
        .unwrap();
    assert_eq!(summary.matches_considered, 2);
    assert_eq!(summary.changes.len(), 2);
    assert_eq!(summary.current_rating, Some(1545));
    assert_eq!(summary.final_rating, 1600);
    // Opponent lost 20 twice facing the target
    assert_eq!(summary.opponents.len(), 1);
    assert_eq!(summary.opponents[0].delta, -40);
    assert_eq!(summary.opponents[0].final_rating, Some(1440 + 40));

    // Preview wrote nothing
    assert_eq!(rating_of(&deployment.ar_pool, &target2).await, Some(1545));

    let applied = engine
        .apply(
            "ar",
            TARGET_64,
            &Selection::default(),
            &Actor {
                steam_id64: None,
                name: Some("operator".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(rating_of(&deployment.ar_pool, &target2).await, Some(1600));
    assert_eq!(rating_of(&deployment.ar_pool, &opp2).await, Some(1480));

    // Exactly one audit record, retrievable by id
    let record = deployment
        .state
        .audit
        .get(&applied.audit_id)
        .await
        .unwrap()
        .expect("audit record");
    assert_eq!(record.region, "ar");
    assert_eq!(record.target_steam2, target2);
    assert_eq!(record.rating_before, Some(1545));
    assert_eq!(record.rating_after, Some(1600));
    assert_eq!(record.matches_considered, 2);
    assert_eq!(record.opponents_count, 1);
    assert_eq!(record.opponents_total_delta, -40);
    assert_eq!(record.actor_name.as_deref(), Some("operator"));
}

#[tokio::test]
async fn test_scope_and_explicit_ids_narrow_selection() {
    let deployment = deployment(None).await;
    let region = deployment.state.regions.get("ar").unwrap();

    let target2 = steam2(TARGET_64);
    let opp2 = steam2(OPPONENT_64);
    let win_id = seed_duel(
        &deployment.ar_pool,
        &target2,
        &opp2,
        Some((1500, 1520)),
        None,
        100,
    )
    .await;
    seed_duel(
        &deployment.ar_pool,
        &opp2,
        &target2,
        None,
        Some((1520, 1505)),
        200,
    )
    .await;
    seed_stats(&deployment.ar_pool, &target2, 1505).await;

    let engine = ReversionEngine::new(
        &region.matches,
        &region.ratings,
        &deployment.state.audit,
        1600,
    );

    let wins_only = engine
        .preview(
            "ar",
            TARGET_64,
            &Selection {
                scope: mgeops_wi::repo::Scope::Wins,
                ..Selection::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(wins_only.matches_considered, 1);
    assert_eq!(wins_only.changes[0].id, win_id);

    let by_id = engine
        .preview(
            "ar",
            TARGET_64,
            &Selection {
                match_ids: Some(vec![win_id]),
                ..Selection::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_id.matches_considered, 1);
}

#[tokio::test]
async fn test_regions_are_isolated() {
    let deployment = deployment(None).await;

    let target2 = steam2(TARGET_64);
    let opp2 = steam2(OPPONENT_64);
    // Matches only in br; reverting in ar sees nothing
    seed_duel(
        &deployment.br_pool,
        &target2,
        &opp2,
        Some((1500, 1520)),
        None,
        100,
    )
    .await;
    seed_stats(&deployment.br_pool, &target2, 1520).await;

    let ar = deployment.state.regions.get("ar").unwrap();
    let engine = ReversionEngine::new(
        &ar.matches,
        &ar.ratings,
        &deployment.state.audit,
        1600,
    );

    let summary = engine
        .preview("ar", TARGET_64, &Selection::default())
        .await
        .unwrap();
    assert_eq!(summary.matches_considered, 0);
    assert_eq!(summary.current_rating, None);

    // br untouched by the ar preview
    assert_eq!(rating_of(&deployment.br_pool, &target2).await, Some(1520));
}

#[tokio::test]
async fn test_prior_reversion_count_scoped_to_region() {
    let deployment = deployment(None).await;
    let ar = deployment.state.regions.get("ar").unwrap();
    let br = deployment.state.regions.get("br").unwrap();

    let target2 = steam2(TARGET_64);
    let opp2 = steam2(OPPONENT_64);
    seed_duel(
        &deployment.ar_pool,
        &target2,
        &opp2,
        Some((1500, 1520)),
        None,
        100,
    )
    .await;
    seed_stats(&deployment.ar_pool, &target2, 1520).await;

    let ar_engine = ReversionEngine::new(
        &ar.matches,
        &ar.ratings,
        &deployment.state.audit,
        1600,
    );
    ar_engine
        .apply("ar", TARGET_64, &Selection::default(), &Actor::default())
        .await
        .unwrap();

    let br_engine = ReversionEngine::new(
        &br.matches,
        &br.ratings,
        &deployment.state.audit,
        1600,
    );
    let br_summary = br_engine
        .preview("br", TARGET_64, &Selection::default())
        .await
        .unwrap();
    assert_eq!(br_summary.prior_reversions, 0);

    let ar_summary = ar_engine
        .preview("ar", TARGET_64, &Selection::default())
        .await
        .unwrap();
    assert_eq!(ar_summary.prior_reversions, 1);
}
