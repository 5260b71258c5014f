mod app;
mod effects;
mod logging;

use audit_core::TaskKind;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: audit_app <url> [task,task,...] [context-id]");
        std::process::exit(2);
    };
    let tasks = match args.next() {
        Some(list) => parse_tasks(&list)?,
        None => TaskKind::ALL.to_vec(),
    };
    let context_id = args.next();

    app::run_app(app::AppOptions {
        url,
        tasks,
        context_id,
    })
}

fn parse_tasks(list: &str) -> anyhow::Result<Vec<TaskKind>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            TaskKind::ALL
                .iter()
                .copied()
                .find(|kind| kind.as_str() == name)
                .ok_or_else(|| anyhow::anyhow!("unknown task type: {name}"))
        })
        .collect()
}
