use ac_agents::coordinator::CrossTeamCoordinator;

use super::print_json;

/// Run the `recommend` subcommand.
pub async fn run(coordinator: &CrossTeamCoordinator, project: &str, json: bool) -> anyhow::Result<()> {
    let rec = coordinator.recommend_collaboration(project).await;
    if json {
        return print_json(&rec);
    }

    println!("Project: {}", rec.project);
    if rec.recommended_agents.is_empty() {
        println!("No matching expertise.");
        return Ok(());
    }
    for a in &rec.recommended_agents {
        println!("  {:<20} {:<12} {}", a.name, a.team, a.reason);
    }
    for line in &rec.reasoning {
        println!("  - {line}");
    }
    let composition: Vec<String> = rec
        .team_composition
        .iter()
        .map(|(team, n)| format!("{team}={n}"))
        .collect();
    println!("Composition: {} (total {})", composition.join(", "), rec.total);
    Ok(())
}
