pub mod cooking;
pub mod order_commit;
pub mod order_spawner;
pub mod rider_tick;

#[cfg(test)]
mod end_to_end_tests {
    use bevy_ecs::prelude::World;

    use crate::ecs::{Order, OrderStatus, Position, Rider, RiderStatus};
    use crate::grid::GridPos;
    use crate::orders::create_order_with_cooking_time;
    use crate::placement::{spawn_home, spawn_hotel, spawn_rider};
    use crate::runner::{run_ticks, run_until_settled, simulation_schedule};
    use crate::scenario::{init_world, ScenarioParams};
    use crate::telemetry::SimTelemetry;

    fn empty_world(rows: i32, cols: i32) -> World {
        let mut world = World::new();
        let params = ScenarioParams::default().with_grid(rows, cols);
        init_world(&mut world, &params).expect("init");
        world
    }

    #[test]
    fn delivers_one_order_end_to_end() {
        let mut world = empty_world(1, 11);
        let rider = spawn_rider(&mut world, GridPos::new(0, 0), 1.0).expect("rider");
        let hotel = spawn_hotel(&mut world, GridPos::new(0, 5)).expect("hotel");
        let home = spawn_home(&mut world, GridPos::new(0, 10)).expect("home");
        let placed = create_order_with_cooking_time(&mut world, home, hotel, 100).expect("order");

        let mut schedule = simulation_schedule();
        let ticks = run_until_settled(&mut world, &mut schedule, 100);
        assert!(ticks < 100, "simulation never settled");

        let order = world.get::<Order>(placed.order).expect("order");
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.distance_covered, Some(10));
        assert!(order.pickup_at_ms.is_some());

        let state = world.get::<Rider>(rider).expect("rider");
        assert_eq!(state.status, RiderStatus::Idle);
        assert_eq!(state.deliveries_completed, 1);
        assert!(state.earnings > 0.0);
        // Delivered at the home, then rode back to the hotel.
        assert_eq!(world.get::<Position>(rider).expect("pos").0, GridPos::new(0, 5));
        assert_eq!(state.distance_traveled, 15);

        let telemetry = world.resource::<SimTelemetry>();
        assert_eq!(telemetry.deliveries.len(), 1);
    }

    #[test]
    fn rider_waits_at_hotel_until_food_is_ready() {
        let mut world = empty_world(1, 6);
        let rider = spawn_rider(&mut world, GridPos::new(0, 0), 1.0).expect("rider");
        let hotel = spawn_hotel(&mut world, GridPos::new(0, 1)).expect("hotel");
        let home = spawn_home(&mut world, GridPos::new(0, 5)).expect("home");
        // 10 ticks of cooking at the default 50 ms period.
        create_order_with_cooking_time(&mut world, home, hotel, 500).expect("order");

        let mut schedule = simulation_schedule();
        run_ticks(&mut world, &mut schedule, 3);
        assert_eq!(
            world.get::<Rider>(rider).expect("rider").status,
            RiderStatus::WaitingForFood
        );
        run_ticks(&mut world, &mut schedule, 7);
        assert_eq!(
            world.get::<Rider>(rider).expect("rider").status,
            RiderStatus::Delivering
        );
    }
}
