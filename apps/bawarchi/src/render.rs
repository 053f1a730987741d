use recipe_core::{
    present::{sentence_case, title_case},
    StepStatus, StepView, TimelineState,
};
use shared::domain::{Recipe, SavedRecipeRecord};

pub fn print_record(record: &SavedRecipeRecord) {
    println!(
        "{} (saved {})",
        record.name,
        record.saved_at.format("%Y-%m-%d %H:%M UTC")
    );
    print_recipe(&record.recipe);
}

pub fn print_recipe(recipe: &Recipe) {
    for (key, step) in recipe.keyed_steps() {
        match step.time.badge() {
            Some(badge) => println!("{}  [{badge}]", title_case(&key)),
            None => println!("{}", title_case(&key)),
        }
        println!("    {}", sentence_case(&step.procedure));
        for measurement in &step.measurements {
            println!(
                "    - {}: {}",
                title_case(&measurement.ingredient),
                measurement.quantity
            );
        }
    }
}

pub fn print_ingredients(recipe: &Recipe) {
    for measurement in recipe.ingredients() {
        println!(
            "{:<24} {}",
            title_case(&measurement.ingredient),
            measurement.quantity
        );
    }
}

pub fn print_timeline(views: &[StepView]) {
    for view in views {
        let marker = match view.status {
            StepStatus::Done => "x",
            StepStatus::Active => ">",
            StepStatus::Upcoming => " ",
        };
        let badge = view.time_badge.as_deref().unwrap_or("");
        println!("[{marker}] {:<8} {badge}", view.title);
    }
}

pub fn print_active_step(views: &[StepView], state: &TimelineState, progress: &str) {
    let Some(view) = views.get(state.current_step_index) else {
        return;
    };
    println!("{progress}: {}", view.procedure);
    for measurement in &view.measurements {
        println!("    - {}: {}", measurement.ingredient, measurement.quantity);
    }
    if view.has_timer {
        println!("    timer {} ({:?})", state.clock(), state.phase());
    }
}
