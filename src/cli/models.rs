use anyhow::Result;

use edascan::fit::FitModelRegistry;

/// List every built-in model with its parameters
pub fn run() -> Result<()> {
    let registry = FitModelRegistry::with_builtin_models();

    println!("Fit Models");
    println!("==========");
    for model in registry.iter() {
        println!("  {:<20} {}", model.name(), model.parameter_names().join(", "));
    }

    Ok(())
}
