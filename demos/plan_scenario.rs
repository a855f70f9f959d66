//! Plans a small two-worker gathering run and prints the result.
//!
//! Run with `RUST_LOG=debug` to watch the search progress. The plan is also
//! written as a Graphviz file next to the working directory.

use harvest_rs::{
    Goal, NodeType, PlanVisualizer, Planner, PlannerConfig, Position, ResourceKind, ResourceNodeView, Result,
    Snapshot, UnitView,
};

fn main() -> Result<()> {
    env_logger::init();

    // A 12x12 map with the town hall in the north-west corner
    let snapshot = Snapshot::new(12, 12, 0)
        .with_unit(UnitView::new(1, 0, "TownHall", Position::new(1, 1)))
        .with_unit(UnitView::new(2, 0, "Peasant", Position::new(3, 2)))
        .with_unit(UnitView::new(3, 0, "Peasant", Position::new(2, 4)).with_cargo(ResourceKind::Wood, 40))
        .with_unit(UnitView::new(4, 1, "Footman", Position::new(10, 10)))
        .with_resource(ResourceNodeView::new(20, NodeType::GoldMine, Position::new(7, 3), 400))
        .with_resource(ResourceNodeView::new(21, NodeType::GoldMine, Position::new(9, 9), 1000))
        .with_resource(ResourceNodeView::new(30, NodeType::Tree, Position::new(2, 8), 250))
        .with_resource(ResourceNodeView::new(31, NodeType::Tree, Position::new(3, 8), 250));

    // Collect 200 gold and 140 wood
    let goal = Goal::new(200, 140);

    let config = PlannerConfig::from_json(r#"{"limits": {"max_expansions": 50000}}"#)?;
    let planner = Planner::new(config);
    let plan = planner.plan(&snapshot, &goal)?;

    println!(
        "Plan: {} actions, cost {}, gold {}, wood {} ({} states expanded)",
        plan.len(),
        plan.cost,
        plan.gold,
        plan.wood,
        plan.stats.expanded
    );
    for (i, action) in plan.iter().enumerate() {
        println!("{:>3}. {}", i + 1, action);
        for command in action.commands()? {
            println!("       {}", command);
        }
    }

    // Visualize the plan
    let initial = planner.initial_state(&snapshot, &goal)?;
    PlanVisualizer::new().write_to_file(&initial, &plan.actions, "./gathering_plan.dot")?;

    Ok(())
}
