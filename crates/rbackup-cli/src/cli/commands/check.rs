//! `rbackup check` – show the resolved backup plan in execution order.

use anyhow::Result;
use rbackup_core::pipeline::{self, Plan};
use std::path::Path;

pub fn run_check(config_path: &Path) -> Result<()> {
    let plan = Plan::load(config_path, pipeline::today())?;
    for line in render_plan(&plan) {
        println!("{}", line);
    }
    Ok(())
}

pub(crate) fn render_plan(plan: &Plan) -> Vec<String> {
    let s = &plan.settings;
    let mut lines = vec![
        format!("root_dir: {}", s.root_dir),
        format!(
            "concurrent_rsync: {}  retention_days: {}  rsync: {}",
            s.concurrency_limit, s.retention_days, s.rsync_path
        ),
    ];
    if plan.paths.is_empty() {
        lines.push("No backup paths configured.".to_string());
        return lines;
    }
    lines.push(format!(
        "{:<4} {:<20} {:<30} {:<6} {:<6} {:<8} {}",
        "#", "HOST", "PATH", "KEEP", "LIMIT", "BWLIMIT", "USER"
    ));
    for (i, p) in plan.paths.iter().enumerate() {
        lines.push(format!(
            "{:<4} {:<20} {:<30} {:<6} {:<6} {:<8} {}",
            i + 1,
            p.host,
            p.path,
            p.retention_days,
            p.concurrency_limit,
            p.bandwidth_limit
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
            p.login_user.as_deref().unwrap_or("-")
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbackup_core::config::RawConfig;

    fn plan(doc: &str) -> Plan {
        let raw = RawConfig::from_toml_str(doc, Path::new("inline")).unwrap();
        Plan::from_config(&raw, pipeline::today()).unwrap()
    }

    #[test]
    fn renders_paths_in_execution_order() {
        let lines = render_plan(&plan(
            r#"
            root_dir = "/b"
            [[hosts]]
            name = "web"
            login_user = "bk"
            [[hosts.dirs]]
            path = "/var/www"
            bandwidth_limit = 500
            [[hosts]]
            name = "db"
            [[hosts.dirs]]
            path = "/srv/pg"
            retention_days = 30
        "#,
        ));
        assert_eq!(lines[0], "root_dir: /b");
        assert_eq!(lines.len(), 5);
        assert!(lines[3].contains("db") && lines[3].contains("/srv/pg") && lines[3].contains("30"));
        assert!(lines[4].contains("web") && lines[4].contains("500") && lines[4].ends_with("bk"));
    }

    #[test]
    fn renders_empty_plan() {
        let lines = render_plan(&plan("root_dir = \"/b\"\n"));
        assert_eq!(lines.last().unwrap(), "No backup paths configured.");
    }
}
