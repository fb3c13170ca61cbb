use crate::cli::FindArgs;
use crate::commands::compile::load_model;
use crate::error::Result;
use stoichkit::core::models::model::Model;
use tracing::info;

pub fn run(args: FindArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let matches = find(&model, &args.pattern);
    info!(pattern = %args.pattern, found = matches.len(), "Wildcard search finished.");

    if matches.is_empty() {
        println!("No objects match '{}'.", args.pattern);
    }
    for (path, class) in &matches {
        println!("{:<40} {}", path, class);
    }
    Ok(())
}

/// Paths and class names of every object matching `pattern`, in path order.
fn find(model: &Model, pattern: &str) -> Vec<(String, String)> {
    model
        .wildcard_find(pattern)
        .into_iter()
        .filter_map(|id| {
            let class = model.object(id)?.class_name().to_string();
            Some((model.path_of(id)?, class))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoichkit::core::io::model_file;

    const MODEL: &str = r#"
[[compartment]]
name = "cyt"

[[compartment]]
name = "dend"

[[pool]]
name = "A"
compartment = "cyt"

[[pool]]
name = "C"
compartment = "dend"
buffered = true

[[reac]]
name = "r"
compartment = "cyt"
substrates = ["A"]
products = ["/dend/C"]
"#;

    #[test]
    fn find_lists_paths_and_classes() {
        let model = model_file::parse(MODEL).unwrap();
        assert_eq!(
            find(&model, "/cyt/##"),
            vec![
                ("/cyt/A".to_string(), "Pool".to_string()),
                ("/cyt/r".to_string(), "Reac".to_string()),
            ]
        );
        assert_eq!(
            find(&model, "/dend/##"),
            vec![("/dend/C".to_string(), "BufPool".to_string())]
        );
        assert!(find(&model, "/nucleus/##").is_empty());
    }
}
