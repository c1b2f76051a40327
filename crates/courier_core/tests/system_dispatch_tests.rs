mod support;

use courier_core::dispatch::{
    dispatch_order, pending_dispatch_system, unassigned_orders, DispatchMode, DispatchOutcome,
};
use courier_core::ecs::{Order, Rider, RiderStatus};
use courier_core::grid::GridPos;
use courier_core::orders::create_order;
use courier_core::telemetry::{ActivityKind, SimTelemetry};

use support::schedule::ScheduleRunner;
use support::world::{home_at, hotel_at, rider_at, TestWorldBuilder};

#[test]
fn nearby_home_is_batched_even_with_an_idle_rider_available() {
    let mut world = TestWorldBuilder::new().build();
    let near = rider_at(&mut world, 0, 0);
    let _spare = rider_at(&mut world, 5, 5);
    let hotel = hotel_at(&mut world, 0, 3);
    let first_home = home_at(&mut world, 9, 9);
    let second_home = home_at(&mut world, 9, 7);

    let first = create_order(&mut world, first_home, hotel).expect("first");
    assert_eq!(
        first.outcome,
        DispatchOutcome::Dispatched {
            rider: near,
            path_len: 3
        }
    );

    let second = create_order(&mut world, second_home, hotel).expect("second");
    assert_eq!(
        second.outcome,
        DispatchOutcome::Batched {
            rider: near,
            home_distance: 2
        }
    );
    let rider = world.get::<Rider>(near).expect("rider");
    assert_eq!(rider.assigned_orders, vec![first.order, second.order]);
}

#[test]
fn distant_home_goes_to_an_idle_rider() {
    let mut world = TestWorldBuilder::new().with_batch_radius(8).build();
    let near = rider_at(&mut world, 0, 0);
    let spare = rider_at(&mut world, 5, 5);
    let hotel = hotel_at(&mut world, 0, 3);
    let first_home = home_at(&mut world, 9, 9);
    let far_home = home_at(&mut world, 0, 9);

    create_order(&mut world, first_home, hotel).expect("first");
    let second = create_order(&mut world, far_home, hotel).expect("second");
    assert_eq!(second.outcome.rider(), Some(spare));
    assert!(matches!(second.outcome, DispatchOutcome::Dispatched { .. }));
    assert_eq!(
        world.get::<Rider>(near).expect("rider").assigned_orders.len(),
        1
    );
}

#[test]
fn full_batch_is_skipped() {
    let mut world = TestWorldBuilder::new().with_max_batch_size(1).build();
    let near = rider_at(&mut world, 0, 0);
    let spare = rider_at(&mut world, 5, 5);
    let hotel = hotel_at(&mut world, 0, 3);
    let first_home = home_at(&mut world, 9, 9);
    let second_home = home_at(&mut world, 9, 8);

    let first = create_order(&mut world, first_home, hotel).expect("first");
    assert_eq!(first.outcome.rider(), Some(near));
    let second = create_order(&mut world, second_home, hotel).expect("second");
    assert_eq!(second.outcome.rider(), Some(spare));
}

#[test]
fn saturated_fleet_forces_a_batch_onto_the_en_route_rider() {
    let mut world = TestWorldBuilder::new().build();
    let only = rider_at(&mut world, 0, 0);
    let hotel = hotel_at(&mut world, 0, 3);
    let first_home = home_at(&mut world, 9, 9);
    let far_home = home_at(&mut world, 0, 9);

    create_order(&mut world, first_home, hotel).expect("first");
    let second = create_order(&mut world, far_home, hotel).expect("second");
    assert_eq!(second.outcome, DispatchOutcome::ForcedBatch { rider: only });

    let telemetry = world.resource::<SimTelemetry>();
    assert!(telemetry
        .activity
        .iter()
        .any(|entry| entry.kind == ActivityKind::ForcedBatch));
}

#[test]
fn order_for_another_hotel_waits_then_is_delivered() {
    let mut world = TestWorldBuilder::new().build();
    let only = rider_at(&mut world, 0, 0);
    let hotel_a = hotel_at(&mut world, 0, 2);
    let hotel_b = hotel_at(&mut world, 4, 0);
    let home_a = home_at(&mut world, 2, 2);
    let home_b = home_at(&mut world, 6, 0);

    create_order(&mut world, home_a, hotel_a).expect("first");
    let second = create_order(&mut world, home_b, hotel_b).expect("second");
    assert_eq!(second.outcome, DispatchOutcome::Queued);
    assert_eq!(unassigned_orders(&mut world), vec![second.order]);

    let mut runner = ScheduleRunner::new();
    runner.settle(&mut world, 200);

    let order = world.get::<Order>(second.order).expect("order");
    assert!(order.is_delivered());
    assert_eq!(order.rider, Some(only));
    assert_eq!(
        world.get::<Rider>(only).expect("rider").deliveries_completed,
        2
    );
}

#[test]
fn enclosed_rider_leaves_the_order_unassigned() {
    let mut world = TestWorldBuilder::new()
        .with_grid(5, 5)
        .with_walls([GridPos::new(0, 1), GridPos::new(1, 0)])
        .build();
    let trapped = rider_at(&mut world, 0, 0);
    let hotel = hotel_at(&mut world, 4, 4);
    let home = home_at(&mut world, 4, 0);

    let placed = create_order(&mut world, home, hotel).expect("order");
    assert_eq!(placed.outcome, DispatchOutcome::Unroutable { rider: trapped });

    let order = world.get::<Order>(placed.order).expect("order");
    assert_eq!(order.rider, None);
    let rider = world.get::<Rider>(trapped).expect("rider");
    assert_eq!(rider.status, RiderStatus::Idle);
    assert!(rider.assigned_orders.is_empty());
    assert_eq!(world.resource::<SimTelemetry>().routing_failures, 1);

    // The sweep keeps retrying without assigning.
    let mut runner = ScheduleRunner::new();
    runner.run_ticks(&mut world, 5);
    assert_eq!(world.get::<Order>(placed.order).expect("order").rider, None);
}

#[test]
fn fairness_mode_prefers_the_rider_with_lower_earnings() {
    for (mode, expected_far) in [(DispatchMode::Efficiency, false), (DispatchMode::Fairness, true)] {
        let mut world = TestWorldBuilder::new().with_dispatch_mode(mode).build();
        let rich = rider_at(&mut world, 0, 2);
        let poor = rider_at(&mut world, 0, 9);
        world.get_mut::<Rider>(rich).expect("rider").earnings = 50.0;
        let hotel = hotel_at(&mut world, 0, 0);
        let home = home_at(&mut world, 5, 0);

        let placed = create_order(&mut world, home, hotel).expect("order");
        let expected = if expected_far { poor } else { rich };
        assert_eq!(placed.outcome.rider(), Some(expected), "{mode}");
    }
}

#[test]
fn redispatching_an_assigned_order_is_a_no_op() {
    let mut world = TestWorldBuilder::new().build();
    rider_at(&mut world, 0, 0);
    let hotel = hotel_at(&mut world, 0, 3);
    let home = home_at(&mut world, 3, 3);
    let placed = create_order(&mut world, home, hotel).expect("order");
    assert!(placed.outcome.is_assigned());
    assert_eq!(dispatch_order(&mut world, placed.order), DispatchOutcome::NotPending);
}

#[test]
fn sweep_batches_queued_orders_for_one_hotel_in_both_modes() {
    for mode in [DispatchMode::Efficiency, DispatchMode::Fairness] {
        let mut world = TestWorldBuilder::new().with_dispatch_mode(mode).build();
        let hotel = hotel_at(&mut world, 0, 5);
        let first_home = home_at(&mut world, 9, 9);
        let second_home = home_at(&mut world, 9, 8);
        let first = create_order(&mut world, first_home, hotel).expect("first");
        let second = create_order(&mut world, second_home, hotel).expect("second");
        assert_eq!(first.outcome, DispatchOutcome::Queued, "{mode}");
        assert_eq!(second.outcome, DispatchOutcome::Queued, "{mode}");

        let far = rider_at(&mut world, 0, 0);
        let near = rider_at(&mut world, 0, 9);
        pending_dispatch_system(&mut world);

        let rider = world.get::<Rider>(near).expect("rider");
        assert_eq!(rider.assigned_orders, vec![first.order, second.order], "{mode}");
        assert!(world.get::<Rider>(far).expect("rider").is_idle(), "{mode}");
        let telemetry = world.resource::<SimTelemetry>();
        assert!(
            telemetry
                .activity
                .iter()
                .any(|entry| entry.kind == ActivityKind::Batched && entry.order_seq == Some(2)),
            "{mode}"
        );
    }
}

#[test]
fn fairness_sweep_matches_queued_orders_jointly() {
    // Order 1 alone would take the rider at (0,2); the joint match crosses
    // the riders over for a total of 4 cells instead of 6.
    for (mode, crossed) in [(DispatchMode::Efficiency, false), (DispatchMode::Fairness, true)] {
        let mut world = TestWorldBuilder::new().with_dispatch_mode(mode).build();
        let hotel_a = hotel_at(&mut world, 0, 3);
        let hotel_b = hotel_at(&mut world, 0, 0);
        let home_a = home_at(&mut world, 9, 3);
        let home_b = home_at(&mut world, 9, 0);
        let first = create_order(&mut world, home_a, hotel_a).expect("first");
        let second = create_order(&mut world, home_b, hotel_b).expect("second");

        let left = rider_at(&mut world, 0, 2);
        let right = rider_at(&mut world, 0, 5);
        pending_dispatch_system(&mut world);

        let (expected_first, expected_second) = if crossed { (right, left) } else { (left, right) };
        let rider_of = |order| world.get::<Order>(order).expect("order").rider;
        assert_eq!(rider_of(first.order), Some(expected_first), "{mode}");
        assert_eq!(rider_of(second.order), Some(expected_second), "{mode}");
        assert!(unassigned_orders(&mut world).is_empty(), "{mode}");

        ScheduleRunner::new().settle(&mut world, 200);
        assert!(world.get::<Order>(first.order).expect("order").is_delivered());
        assert!(world.get::<Order>(second.order).expect("order").is_delivered());
    }
}
