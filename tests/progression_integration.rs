//! End-to-end level progression and position transfer tests.

mod common;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use rendement::config::EngineConfig;
use rendement::interfaces::{NotificationKind, PlatformStore};
use rendement::services::{
    CommissionAggregator, EarningsSyncJob, LevelProgressionJob, PositionTransfer,
};

use common::{platform, register};

#[tokio::test]
async fn test_downline_deposits_promote_the_sponsor() {
    let p = platform(dec!(20), EngineConfig::default()).await;
    let t0 = Utc::now() - Duration::weeks(3);

    // Sponsor's qualifying deposit of 1,000 sets a 5,000 target with a
    // three-week window.
    let sponsor = register(&p.store, None).await;
    p.deposits
        .confirm(sponsor, p.opportunity, dec!(1000), t0)
        .await
        .unwrap();

    // A referred member's deposit fills the sponsor's pot.
    let member = register(&p.store, Some(sponsor)).await;
    p.deposits
        .confirm(member, p.opportunity, dec!(5000), t0 + Duration::days(2))
        .await
        .unwrap();

    let progression = LevelProgressionJob::new(
        p.store.clone(),
        p.notifier.clone(),
        p.engine.challenge.clone(),
    );
    let now = t0 + Duration::weeks(3);
    let report = progression.run_once(now).await.unwrap();
    // The member's own challenge (deadline t0+2d+3w) is not due yet.
    assert_eq!(report.promoted, 1);

    let sponsor_user = p.store.user(sponsor).await.unwrap();
    assert_eq!(sponsor_user.level, 2);
    let challenge = sponsor_user.challenge.expect("new window opened");
    assert_eq!(challenge.target, dec!(5000));
    assert_eq!(challenge.deadline, now + Duration::weeks(2));

    // The next investment is created at the level-2 rate.
    let investment = p
        .deposits
        .confirm(sponsor, p.opportunity, dec!(1000), now)
        .await
        .unwrap();
    assert_eq!(investment.weekly_rate, dec!(25));
}

#[tokio::test]
async fn test_blocked_user_feeds_upline_but_not_themselves() {
    let p = platform(dec!(10), EngineConfig::default()).await;
    let t0 = Utc::now() - Duration::weeks(4);

    let sponsor = register(&p.store, None).await;
    let member = register(&p.store, Some(sponsor)).await;
    p.deposits
        .confirm(member, p.opportunity, dec!(100000), t0)
        .await
        .unwrap();

    // Deadline passes with an empty pot: the member is blocked.
    let progression = LevelProgressionJob::new(
        p.store.clone(),
        p.notifier.clone(),
        p.engine.challenge.clone(),
    );
    progression.run_once(t0 + Duration::weeks(3)).await.unwrap();

    let member_user = p.store.user(member).await.unwrap();
    assert!(member_user.benefits_blocked);
    let kinds: Vec<NotificationKind> = p
        .notifier
        .sent_to(member)
        .await
        .iter()
        .map(|n| n.kind)
        .collect();
    assert_eq!(kinds, vec![NotificationKind::ChallengeFailed]);

    // A later sync pass: the investment accrued 4 weeks of 10% on
    // 100,000 = 40,000 gross. The sponsor's 4,000 still flows; the
    // member's 36,000 is held, not credited.
    let sync = EarningsSyncJob::new(p.store.clone(), p.engine.referral.clone());
    let report = sync.run_once(t0 + Duration::weeks(4)).await.unwrap();
    assert_eq!(report.commissions, dec!(4000.00));
    assert_eq!(report.distributed, dec!(0));

    let member_user = p.store.user(member).await.unwrap();
    assert_eq!(member_user.balance, dec!(0));
    assert_eq!(member_user.forfeited_earnings, dec!(36000.00));
    let sponsor_user = p.store.user(sponsor).await.unwrap();
    assert_eq!(sponsor_user.total_commissions, dec!(4000.00));
}

#[tokio::test]
async fn test_transferred_downline_earns_for_the_replacement() {
    let p = platform(dec!(10), EngineConfig::default()).await;
    let start = Utc::now() - Duration::weeks(1);
    let now = start + Duration::weeks(1);

    let leaver = register(&p.store, None).await;
    let child = register(&p.store, Some(leaver)).await;
    p.deposits
        .confirm(child, p.opportunity, dec!(10000), start)
        .await
        .unwrap();

    let heir = register(&p.store, None).await;
    let transfer = PositionTransfer::new(p.store.clone(), p.notifier.clone());
    transfer.transfer_position(leaver, heir, now).await.unwrap();

    // The child's live earnings now feed the heir's commission figure,
    // and the leaver's tree is empty.
    let aggregator = CommissionAggregator::new(p.store.clone(), p.engine.referral.clone());
    assert_eq!(aggregator.live_commissions(heir, now).await.unwrap(), dec!(100.00));
    assert_eq!(aggregator.live_commissions(leaver, now).await.unwrap(), dec!(0));

    // And the next sync routes the commission to the heir.
    let sync = EarningsSyncJob::new(p.store.clone(), p.engine.referral.clone());
    sync.run_once(now).await.unwrap();
    assert_eq!(
        p.store.user(heir).await.unwrap().total_commissions,
        dec!(100.00)
    );
    assert_eq!(
        p.store.user(leaver).await.unwrap().total_commissions,
        dec!(0)
    );
}
