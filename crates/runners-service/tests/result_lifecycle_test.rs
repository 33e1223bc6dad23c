//! 成绩生命周期集成测试
//!
//! 使用内存存储验证创建、修改、删除成绩时最佳成绩的维护，
//! 以及任一步骤失败时的整体回滚。

use std::sync::Arc;

use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use uuid::Uuid;

use runners::dto::{ResultRequest, RunnerFilter, UpdateResultRequest};
use runners::test_utils::MemoryStore;
use runners::{ErrorStatus, RaceTime, ResponseError, ResultService, RunnerError, RunnerService};

const SEASON: i32 = 2023;

type MemoryResultService = ResultService<MemoryStore, MemoryStore, MemoryStore>;

// ==================== 辅助函数 ====================

struct Fixture {
    store: Arc<MemoryStore>,
    service: MemoryResultService,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let service = ResultService::new(store.clone(), store.clone(), store.clone())
            .with_season_year(Some(SEASON));
        Self { store, service }
    }

    async fn runner(&self) -> Uuid {
        let first: String = FirstName().fake();
        let last: String = LastName().fake();
        self.store.seed_runner(&first, &last).await
    }

    async fn add(&self, runner_id: Uuid, race_result: &str, year: i32) -> Uuid {
        self.service
            .create_result(&request(runner_id, race_result, year))
            .await
            .expect("创建成绩失败")
            .id
    }

    async fn bests(&self, runner_id: Uuid) -> (Option<RaceTime>, Option<RaceTime>) {
        let runner = self.store.runner(runner_id).await.expect("跑者不存在");
        (runner.personal_best, runner.season_best)
    }
}

fn request(runner_id: Uuid, race_result: &str, year: i32) -> ResultRequest {
    ResultRequest {
        runner_id: runner_id.to_string(),
        race_result: race_result.to_string(),
        location: "Boston".to_string(),
        position: 3,
        year,
    }
}

fn t(text: &str) -> Option<RaceTime> {
    Some(RaceTime::parse(text).unwrap())
}

// ==================== 新增路径 ====================

#[tokio::test]
async fn test_first_result_becomes_personal_best() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;

    fx.add(runner_id, "02:13:13", 2020).await;

    assert_eq!(fx.bests(runner_id).await, (t("02:13:13"), None));
}

#[tokio::test]
async fn test_personal_best_tracks_running_minimum() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;

    let submissions = [
        ("02:30:00", 2021),
        ("02:10:00", SEASON),
        ("02:20:00", SEASON),
        ("02:05:00", 2022),
        ("02:08:00", SEASON),
        ("02:40:00", SEASON),
    ];

    let mut seen: Vec<(RaceTime, i32)> = Vec::new();
    for (time, year) in submissions {
        fx.add(runner_id, time, year).await;
        seen.push((RaceTime::parse(time).unwrap(), year));

        let expected_pb = seen.iter().map(|(t, _)| *t).min();
        let expected_sb = seen
            .iter()
            .filter(|(_, y)| *y == SEASON)
            .map(|(t, _)| *t)
            .min();
        assert_eq!(fx.bests(runner_id).await, (expected_pb, expected_sb));
    }
}

// ==================== 删除路径 ====================

#[tokio::test]
async fn test_deleting_best_recomputes_from_remaining() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;

    fx.add(runner_id, "02:00:41", SEASON).await;
    let best = fx.add(runner_id, "01:18:28", SEASON).await;
    assert_eq!(fx.bests(runner_id).await, (t("01:18:28"), t("01:18:28")));

    let removed = fx.service.delete_result(&best.to_string()).await.unwrap();
    assert_eq!(removed.runner_id, runner_id);
    assert_eq!(Some(removed.race_result), t("01:18:28"));

    assert_eq!(fx.bests(runner_id).await, (t("02:00:41"), t("02:00:41")));
}

#[tokio::test]
async fn test_deleting_last_result_clears_bests() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    let only = fx.add(runner_id, "02:00:41", SEASON).await;

    fx.service.delete_result(&only.to_string()).await.unwrap();

    assert_eq!(fx.bests(runner_id).await, (None, None));
}

#[tokio::test]
async fn test_deleting_non_best_keeps_bests() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    fx.add(runner_id, "01:18:28", SEASON).await;
    let slower = fx.add(runner_id, "02:00:41", SEASON).await;

    fx.service.delete_result(&slower.to_string()).await.unwrap();

    assert_eq!(fx.bests(runner_id).await, (t("01:18:28"), t("01:18:28")));
}

#[tokio::test]
async fn test_deleting_one_of_tied_bests_keeps_best() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    let first = fx.add(runner_id, "01:18:28", SEASON).await;
    fx.add(runner_id, "01:18:28", SEASON).await;

    fx.service.delete_result(&first.to_string()).await.unwrap();

    assert_eq!(fx.bests(runner_id).await, (t("01:18:28"), t("01:18:28")));
}

#[tokio::test]
async fn test_deleting_past_year_result_leaves_season_best() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    fx.add(runner_id, "02:00:00", SEASON).await;
    let past = fx.add(runner_id, "01:50:00", 2021).await;
    assert_eq!(fx.bests(runner_id).await, (t("01:50:00"), t("02:00:00")));

    fx.service.delete_result(&past.to_string()).await.unwrap();

    assert_eq!(fx.bests(runner_id).await, (t("02:00:00"), t("02:00:00")));
}

#[tokio::test]
async fn test_delete_unknown_result_is_not_found() {
    let fx = Fixture::new();
    let err = fx
        .service
        .delete_result(&Uuid::new_v4().to_string())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::ResultNotFound(_)));
    assert_eq!(ResponseError::from(err).status, ErrorStatus::NotFound);
    assert_eq!(fx.store.rollback_count(), 1);
}

// ==================== 修改路径 ====================

#[tokio::test]
async fn test_update_to_faster_time_improves_bests() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    let id = fx.add(runner_id, "02:00:41", SEASON).await;

    fx.service
        .update_result(&UpdateResultRequest {
            id: id.to_string(),
            result: request(runner_id, "01:59:59", SEASON),
        })
        .await
        .unwrap();

    assert_eq!(fx.bests(runner_id).await, (t("01:59:59"), t("01:59:59")));
}

#[tokio::test]
async fn test_update_slowing_the_best_relaxes_to_next_minimum() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    let best = fx.add(runner_id, "01:18:28", SEASON).await;
    fx.add(runner_id, "02:00:41", SEASON).await;

    fx.service
        .update_result(&UpdateResultRequest {
            id: best.to_string(),
            result: request(runner_id, "03:00:00", SEASON),
        })
        .await
        .unwrap();

    assert_eq!(fx.bests(runner_id).await, (t("02:00:41"), t("02:00:41")));
}

#[tokio::test]
async fn test_update_moving_best_to_past_year() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    let best = fx.add(runner_id, "01:18:28", SEASON).await;

    fx.service
        .update_result(&UpdateResultRequest {
            id: best.to_string(),
            result: request(runner_id, "01:18:28", 2020),
        })
        .await
        .unwrap();

    assert_eq!(fx.bests(runner_id).await, (t("01:18:28"), None));
}

#[tokio::test]
async fn test_update_cannot_move_result_to_other_runner() {
    let fx = Fixture::new();
    let owner = fx.runner().await;
    let other = fx.runner().await;
    let id = fx.add(owner, "02:00:41", SEASON).await;

    let err = fx
        .service
        .update_result(&UpdateResultRequest {
            id: id.to_string(),
            result: request(other, "01:00:00", SEASON),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::ResultNotFound(missing) if missing == id));
    assert_eq!(fx.bests(owner).await, (t("02:00:41"), t("02:00:41")));
    assert_eq!(fx.bests(other).await, (None, None));
}

// ==================== 原子性 ====================

#[tokio::test]
async fn test_unparsable_time_leaves_no_row() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;

    let err = fx
        .service
        .create_result(&request(runner_id, "1:18:28", SEASON))
        .await
        .unwrap_err();

    assert_eq!(err.status(), ErrorStatus::BadRequest);
    assert_eq!(err.to_string(), "Invalid race result");
    assert_eq!(fx.store.result_count().await, 0);
    assert_eq!(fx.store.begin_count(), 0);
}

#[tokio::test]
async fn test_aggregate_failure_rolls_back_inserted_result() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    fx.add(runner_id, "02:00:41", SEASON).await;
    fx.store.fail_next_best_times_update();

    let err = fx
        .service
        .create_result(&request(runner_id, "01:18:28", SEASON))
        .await
        .unwrap_err();

    assert_eq!(err.status(), ErrorStatus::Internal);
    assert_eq!(fx.store.results_of(runner_id).await.len(), 1);
    assert_eq!(fx.bests(runner_id).await, (t("02:00:41"), t("02:00:41")));
    assert_eq!(fx.store.rollback_count(), 1);
}

#[tokio::test]
async fn test_recompute_failure_during_delete_restores_result() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    let best = fx.add(runner_id, "01:18:28", SEASON).await;
    fx.add(runner_id, "02:00:41", SEASON).await;
    fx.store.fail_next_min_query();

    assert!(fx.service.delete_result(&best.to_string()).await.is_err());

    assert_eq!(fx.store.results_of(runner_id).await.len(), 2);
    assert_eq!(fx.bests(runner_id).await, (t("01:18:28"), t("01:18:28")));
}

#[tokio::test]
async fn test_insert_failure_rolls_back() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    fx.store.fail_next_insert();

    assert!(
        fx.service
            .create_result(&request(runner_id, "02:00:41", SEASON))
            .await
            .is_err()
    );

    assert_eq!(fx.store.result_count().await, 0);
    assert_eq!(fx.store.commit_count(), 0);
    assert_eq!(fx.store.rollback_count(), 1);
}

// ==================== 重算 ====================

#[tokio::test]
async fn test_recompute_repairs_stale_bests_and_is_idempotent() {
    let fx = Fixture::new();
    let runner_id = fx.runner().await;
    fx.store.seed_result(runner_id, "02:05:00", SEASON).await.unwrap();
    fx.store.seed_result(runner_id, "01:59:00", 2019).await.unwrap();
    fx.store
        .set_best_times(runner_id, t("03:00:00"), None)
        .await;

    let first = fx
        .service
        .recompute_best_times(&runner_id.to_string())
        .await
        .unwrap();
    assert_eq!(
        (first.personal_best, first.season_best),
        (t("01:59:00"), t("02:05:00"))
    );

    let second = fx
        .service
        .recompute_best_times(&runner_id.to_string())
        .await
        .unwrap();
    assert_eq!(
        (second.personal_best, second.season_best),
        (first.personal_best, first.season_best)
    );
    assert_eq!(fx.bests(runner_id).await, (t("01:59:00"), t("02:05:00")));
}

#[tokio::test]
async fn test_recompute_unknown_runner() {
    let fx = Fixture::new();
    let err = fx
        .service
        .recompute_best_times(&Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::RunnerNotFound(_)));
}

// ==================== 跑者管理 ====================

#[tokio::test]
async fn test_runner_service_over_memory_store() {
    let fx = Fixture::new();
    let runners = RunnerService::new(fx.store.clone(), fx.store.clone())
        .with_season_year(Some(SEASON));

    let fast = fx.store.seed_runner_in("Tigst", "Assefa", "Ethiopia").await;
    let slow = fx.store.seed_runner_in("Amane", "Gobena", "Ethiopia").await;
    fx.add(slow, "02:20:00", SEASON).await;
    fx.add(fast, "02:11:53", SEASON).await;
    fx.add(fast, "02:15:37", 2022).await;

    let runner = runners.get_runner(&fast.to_string()).await.unwrap();
    assert_eq!(runner.results.len(), 2);
    assert_eq!(runner.personal_best, t("02:11:53"));

    let top: Vec<Uuid> = runners
        .list_runners(&RunnerFilter::by_year(SEASON.to_string()))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(top, vec![fast, slow]);

    runners.delete_runner(&slow.to_string()).await.unwrap();
    let by_country = runners
        .list_runners(&RunnerFilter::by_country("Ethiopia"))
        .await
        .unwrap();
    assert_eq!(by_country.len(), 1);
    assert_eq!(by_country[0].id, fast);
}
