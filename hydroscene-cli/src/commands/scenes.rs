//! `hydroscene scenes` - list the built-in operating scenes.

use hydroscene::scene::SceneRegistry;

/// Print the scene table.
pub fn run() {
    println!(
        "{:<12} {:<20} {:<10} {:<10} LAYERS",
        "ID", "NAME", "VIEW", "REFRESH"
    );
    for scene in SceneRegistry::builtin().all() {
        let refresh = if scene.auto_refresh {
            format!("{}s", scene.refresh_interval.as_secs())
        } else {
            "manual".to_string()
        };
        println!(
            "{:<12} {:<20} {:<10} {:<10} {}",
            scene.id.as_str(),
            scene.display_name,
            format!("{:?}", scene.default_view_kind).to_lowercase(),
            refresh,
            scene.default_layers.join(", ")
        );
    }
}
