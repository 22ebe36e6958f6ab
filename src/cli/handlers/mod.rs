mod init;
pub use init::cmd_init;

use std::io::Read;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::ai::{self, CommandGenerator};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::blob::FileBlobStore;
use crate::io::config_io::{self, DATA_DIR};
use crate::io::lock::FileLock;
use crate::io::store::Store;
use crate::model::config::Config;
use crate::model::forest::Forest;
use crate::model::project::UNASSIGNED_ID;
use crate::model::selection::Selection;
use crate::model::task::TaskId;
use crate::ops::ingest::{self, IngestTarget};
use crate::ops::patch::PatchProposal;
use crate::ops::task_ops::{self, TaskPatch};
use crate::ops::{check, query, search};
use crate::parse::outline;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Where a command runs and how it reports
struct Ctx {
    start: PathBuf,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let start = match cli.dir.as_deref() {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let ctx = Ctx {
        start,
        json: cli.json,
    };

    match cli.command {
        Commands::Init(args) => cmd_init(&ctx.start, args),

        // Read commands
        Commands::Projects => cmd_projects(&ctx),
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Export(args) => cmd_export(&ctx, args),
        Commands::History => cmd_history(&ctx),
        Commands::Search(args) => cmd_search(&ctx, args),
        Commands::Check => cmd_check(&ctx),

        // Write commands
        Commands::Project(cmd) => cmd_project(&ctx, cmd.action),
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Sub(args) => cmd_sub(&ctx, args),
        Commands::Edit(args) => cmd_edit(&ctx, args),
        Commands::Rm(args) => cmd_rm(&ctx, args),
        Commands::Mv(args) => cmd_mv(&ctx, args),
        Commands::Promote(args) => cmd_promote(&ctx, args),
        Commands::Reorder(args) => cmd_reorder(&ctx, args),
        Commands::Comment(cmd) => cmd_comment(&ctx, cmd.action),
        Commands::Record(args) => cmd_result(&ctx, args),
        Commands::Summary(args) => cmd_summary(&ctx, args),
        Commands::Select(args) => cmd_select(&ctx, args),
        Commands::Undo => cmd_undo(&ctx),
        Commands::Redo => cmd_redo(&ctx),

        // Generated content
        Commands::Ingest(args) => cmd_ingest(&ctx, args),
        Commands::Patch(args) => cmd_patch(&ctx, args),
        Commands::Expand(args) => cmd_expand(&ctx, args),
        Commands::Regenerate(args) => cmd_regenerate(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn data_dir(ctx: &Ctx) -> Result<PathBuf, String> {
    config_io::discover_data_dir(&ctx.start).ok_or_else(|| {
        format!(
            "no {}/ workspace found from {} (run `scopes init`)",
            DATA_DIR,
            ctx.start.display()
        )
    })
}

fn open_store(data_dir: &Path, config: &Config) -> Result<Store<FileBlobStore>, Box<dyn std::error::Error>> {
    Ok(Store::open(FileBlobStore::new(data_dir), config)?)
}

/// Open the store for reading. No lock is taken.
fn load_store(ctx: &Ctx) -> Result<Store<FileBlobStore>, Box<dyn std::error::Error>> {
    let dir = data_dir(ctx)?;
    let config = config_io::read_config(&dir)?;
    open_store(&dir, &config)
}

/// A store opened under the workspace lock. Dropping it releases the lock
/// after the store.
struct Locked {
    store: Store<FileBlobStore>,
    _lock: FileLock,
}

fn lock_store(ctx: &Ctx) -> Result<Locked, Box<dyn std::error::Error>> {
    let dir = data_dir(ctx)?;
    let config = config_io::read_config(&dir)?;
    let lock = FileLock::acquire(&dir, config.lock.timeout())?;
    let store = open_store(&dir, &config)?;
    Ok(Locked { store, _lock: lock })
}

/// Print save failures. The command itself still succeeded.
fn report_warnings(store: &mut Store<FileBlobStore>) {
    for warning in store.take_warnings() {
        eprintln!("warning: {}", warning);
    }
}

fn resolve_task(forest: &Forest, id: &str) -> Result<TaskId, String> {
    query::resolve_id(forest, id).ok_or_else(|| format!("task not found: {}", id))
}

/// Resolve a project by id, then by case-insensitive name
fn resolve_project(forest: &Forest, key: &str) -> Result<String, String> {
    if let Some(project) = forest.project(key) {
        return Ok(project.id.clone());
    }
    let mut named = forest
        .projects
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(key.trim()));
    match (named.next(), named.next()) {
        (Some(project), None) => Ok(project.id.clone()),
        (Some(_), Some(_)) => Err(format!("more than one project is named '{}'; use its id", key)),
        (None, _) => Err(format!("project not found: {}", key)),
    }
}

/// Read a whole file, or stdin for "-"
fn read_input(file: &str) -> Result<String, Box<dyn std::error::Error>> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(file).map_err(|e| format!("cannot read {}: {}", file, e).into())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_projects(ctx: &Ctx) -> CmdResult {
    let store = load_store(ctx)?;
    let forest = store.forest();
    let projects = forest.ordered_projects();

    if ctx.json {
        let list: Vec<ProjectInfoJson> = projects
            .iter()
            .map(|p| project_info_to_json(forest, p))
            .collect();
        return print_json(&list);
    }
    for project in projects {
        println!("{}", format_project_info(forest, project));
    }
    Ok(())
}

fn cmd_list(ctx: &Ctx, args: ListArgs) -> CmdResult {
    let store = load_store(ctx)?;
    let forest = store.forest();

    let projects = match args.project.as_deref() {
        Some(key) => {
            let id = resolve_project(forest, key)?;
            forest.project(&id).into_iter().collect()
        }
        None => forest.ordered_projects(),
    };

    if ctx.json {
        let list: Vec<ProjectJson> = projects.iter().map(|p| project_to_json(forest, p)).collect();
        return print_json(&list);
    }
    for (i, project) in projects.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_lines(&format_project_listing(forest, project));
    }
    Ok(())
}

fn cmd_show(ctx: &Ctx, args: IdArg) -> CmdResult {
    let store = load_store(ctx)?;
    let forest = store.forest();
    let id = resolve_task(forest, &args.id)?;
    let task = forest.task(&id).ok_or_else(|| format!("task not found: {}", id))?;

    if ctx.json {
        return print_json(&task_detail_to_json(forest, task));
    }
    print_lines(&format_task_detail(forest, task));
    Ok(())
}

/// Print a subtree in the indented outline form `ingest` reads
fn cmd_export(ctx: &Ctx, args: IdArg) -> CmdResult {
    let store = load_store(ctx)?;
    let forest = store.forest();
    let id = resolve_task(forest, &args.id)?;
    let node = ingest::outline_from_task(forest, &id).ok_or_else(|| format!("task not found: {}", id))?;
    print!("{}", outline::to_text(&[node]));
    Ok(())
}

fn cmd_history(ctx: &Ctx) -> CmdResult {
    let store = load_store(ctx)?;
    let history = store.history();

    if ctx.json {
        return print_json(&HistoryJson {
            limit: history.limit(),
            undo: history.past().map(history_entry_to_json).collect(),
            redo: history.future().map(history_entry_to_json).collect(),
        });
    }
    println!("undo:");
    for snapshot in history.past() {
        println!("  {}  {}", snapshot.taken_at.format("%Y-%m-%d %H:%M:%S"), snapshot.label);
    }
    println!("redo:");
    for snapshot in history.future() {
        println!("  {}  {}", snapshot.taken_at.format("%Y-%m-%d %H:%M:%S"), snapshot.label);
    }
    Ok(())
}

fn cmd_search(ctx: &Ctx, args: SearchArgs) -> CmdResult {
    let store = load_store(ctx)?;
    let forest = store.forest();
    let re = Regex::new(&args.pattern)?;
    let project = args
        .project
        .as_deref()
        .map(|key| resolve_project(forest, key))
        .transpose()?;
    let hits = search::search_tasks(forest, &re, project.as_deref());

    if ctx.json {
        let list: Vec<SearchHitJson> = hits
            .iter()
            .filter_map(|hit| {
                let task = forest.task(&hit.task_id)?;
                Some(SearchHitJson {
                    project_id: hit.project_id.clone(),
                    task_id: hit.task_id.clone(),
                    text: task.text.clone(),
                    field: hit.field,
                })
            })
            .collect();
        return print_json(&list);
    }

    // One line per task even when several of its fields matched
    let mut last: Option<&str> = None;
    for hit in &hits {
        if last == Some(hit.task_id.as_str()) {
            continue;
        }
        last = Some(hit.task_id.as_str());
        if let Some(task) = forest.task(&hit.task_id) {
            println!("[{}] {}", hit.project_id, format_task_line(task));
        }
    }
    Ok(())
}

fn cmd_check(ctx: &Ctx) -> CmdResult {
    let store = load_store(ctx)?;
    let result = check::check_forest(store.forest());

    if ctx.json {
        print_json(&result)?;
    } else {
        print_lines(&format_check(&result));
    }
    if result.valid {
        Ok(())
    } else {
        Err(format!("{} integrity errors", result.errors.len()).into())
    }
}

// ---------------------------------------------------------------------------
// Project management
// ---------------------------------------------------------------------------

fn cmd_project(ctx: &Ctx, action: ProjectAction) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;

    match action {
        ProjectAction::Add(args) => {
            if args.name.trim().is_empty() {
                return Err("project name cannot be empty".into());
            }
            let id = store.create_project(&args.name);
            println!("{}", id);
        }
        ProjectAction::Rename(args) => {
            let id = resolve_project(store.forest(), &args.project)?;
            if !store.rename_project(&id, &args.name) {
                return Err(format!("cannot rename project {} to '{}'", id, args.name).into());
            }
            println!("{}", id);
        }
        ProjectAction::Rm(args) => {
            let id = resolve_project(store.forest(), &args.project)?;
            if !store.delete_project(&id) {
                return Err(format!("cannot delete project {}", id).into());
            }
            println!("{}", id);
        }
        ProjectAction::Pin(args) => {
            let id = resolve_project(store.forest(), &args.project)?;
            if !store.set_pinned(&id, !args.off) {
                return Err(format!("cannot change pin on project {}", id).into());
            }
            println!("{}", id);
        }
        ProjectAction::Describe(args) => {
            let id = resolve_project(store.forest(), &args.project)?;
            if !store.set_project_description(&id, args.text) {
                return Err(format!("project not found: {}", id).into());
            }
            println!("{}", id);
        }
    }
    report_warnings(store);
    Ok(())
}

// ---------------------------------------------------------------------------
// Task edits
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Ctx, args: AddArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let project = match args.project.as_deref() {
        Some(key) => resolve_project(store.forest(), key)?,
        None => UNASSIGNED_ID.to_string(),
    };
    let id = store
        .create_root_task(&project, &args.text)
        .ok_or_else(|| format!("project not found: {}", project))?;
    report_warnings(store);
    println!("{}", id);
    Ok(())
}

fn cmd_sub(ctx: &Ctx, args: SubArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let parent = resolve_task(store.forest(), &args.id)?;
    let ids = store
        .add_subtasks(&parent, task_ops::manual_drafts(&args.texts))
        .ok_or_else(|| format!("task not found: {}", parent))?;
    report_warnings(store);
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_edit(ctx: &Ctx, args: EditArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let id = resolve_task(store.forest(), &args.id)?;

    let status = args.status.as_deref().map(parse_task_status).transpose()?;
    let description = if args.clear_description {
        Some(None)
    } else {
        args.description.map(Some)
    };
    if args.text.is_none() && description.is_none() && status.is_none() {
        return Err("nothing to change (use --text, --description, --clear-description or --status)".into());
    }
    if status.is_some() && store.forest().task(&id).is_some_and(|t| !t.is_leaf()) {
        eprintln!("note: {} has subtasks; its status follows them", id);
    }

    let patch = TaskPatch {
        text: args.text,
        description,
        status,
    };
    if !store.update_task(&id, patch) {
        return Err(format!("task not found: {}", id).into());
    }
    report_warnings(store);
    println!("{}", id);
    Ok(())
}

fn cmd_rm(ctx: &Ctx, args: RmArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let ids = args
        .ids
        .iter()
        .map(|id| resolve_task(store.forest(), id))
        .collect::<Result<Vec<_>, _>>()?;

    let removed = if let [only] = ids.as_slice() {
        let count = query::subtree_ids(store.forest(), only).len();
        if store.delete_task(only) { count } else { 0 }
    } else {
        store.delete_selected(&ids)
    };
    report_warnings(store);
    println!("deleted {} tasks", removed);
    Ok(())
}

fn cmd_mv(ctx: &Ctx, args: MvArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let id = resolve_task(store.forest(), &args.id)?;
    let target = resolve_project(store.forest(), &args.project)?;
    let source = store
        .forest()
        .project_of(&id)
        .map(|p| p.id.clone())
        .ok_or_else(|| format!("task {} is not in any project", id))?;

    if !store.move_task_to_project(&id, &source, &target) {
        return Err(format!("{} is already in project {}", id, target).into());
    }
    report_warnings(store);
    println!("{}", id);
    Ok(())
}

fn cmd_promote(ctx: &Ctx, args: IdArg) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let id = resolve_task(store.forest(), &args.id)?;
    let project = store
        .forest()
        .project_of(&id)
        .map(|p| p.id.clone())
        .ok_or_else(|| format!("task {} is not in any project", id))?;

    if !store.promote_to_root(&project, &id) {
        return Err(format!("{} is already a root task", id).into());
    }
    report_warnings(store);
    println!("{}", id);
    Ok(())
}

fn cmd_reorder(ctx: &Ctx, args: ReorderArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let id = resolve_task(store.forest(), &args.id)?;
    if !store.reorder_task(&id, args.position) {
        return Err(format!("cannot move {} to position {}", id, args.position).into());
    }
    report_warnings(store);
    println!("{}", id);
    Ok(())
}

fn cmd_comment(ctx: &Ctx, action: CommentAction) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;

    match action {
        CommentAction::Add(args) => {
            let id = resolve_task(store.forest(), &args.id)?;
            let comment = store
                .add_comment(&id, &args.text)
                .ok_or("comment text cannot be empty")?;
            println!("{}", comment);
        }
        CommentAction::Reply(args) => {
            let id = resolve_task(store.forest(), &args.id)?;
            let reply = store
                .reply_to_comment(&id, &args.comment, &args.text)
                .ok_or_else(|| format!("comment not found: {}", args.comment))?;
            println!("{}", reply);
        }
        CommentAction::Edit(args) => {
            let id = resolve_task(store.forest(), &args.id)?;
            if !store.edit_comment(&id, &args.comment, &args.text) {
                return Err(format!("comment not found: {}", args.comment).into());
            }
            println!("{}", args.comment);
        }
        CommentAction::Resolve(args) => {
            let id = resolve_task(store.forest(), &args.id)?;
            let status = parse_comment_status(&args.status)?;
            if !store.set_comment_status(&id, &args.comment, status) {
                return Err(format!("comment not found: {}", args.comment).into());
            }
            println!("{}", args.comment);
        }
        CommentAction::Rm(args) => {
            let id = resolve_task(store.forest(), &args.id)?;
            if !store.delete_comment(&id, &args.comment) {
                return Err(format!("comment not found: {}", args.comment).into());
            }
            println!("{}", args.comment);
        }
    }
    report_warnings(store);
    Ok(())
}

fn cmd_result(ctx: &Ctx, args: ResultArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let id = resolve_task(store.forest(), &args.id)?;
    let output = read_input_or_literal(&args.output)?;
    let result = store
        .append_execution_result(&id, &output)
        .ok_or_else(|| format!("task not found: {}", id))?;
    report_warnings(store);
    println!("{}", result);
    Ok(())
}

/// "-" reads stdin; anything else is the text itself
fn read_input_or_literal(text: &str) -> Result<String, Box<dyn std::error::Error>> {
    if text == "-" { read_input(text) } else { Ok(text.to_string()) }
}

fn cmd_summary(ctx: &Ctx, args: SummaryArgs) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let text = read_input_or_literal(&args.text)?;

    let summary = if args.project {
        let id = resolve_project(store.forest(), &args.target)?;
        store.append_project_summary(&id, &text)
    } else {
        let id = resolve_task(store.forest(), &args.target)?;
        store.append_task_summary(&id, &text)
    }
    .ok_or("summary text cannot be empty")?;
    report_warnings(store);
    println!("{}", summary);
    Ok(())
}

fn cmd_select(ctx: &Ctx, args: SelectArgs) -> CmdResult {
    if args.id.is_none() && args.project.is_none() && !args.clear {
        let store = load_store(ctx)?;
        let selection = store.selection();
        if ctx.json {
            return print_json(selection);
        }
        let forest = store.forest();
        match selection.project_id.as_deref().and_then(|id| forest.project(id)) {
            Some(project) => println!("project: {} ({})", project.name, project.id),
            None => println!("project: (none)"),
        }
        match selection.task_id.as_deref().and_then(|id| forest.task(id)) {
            Some(task) => println!("task: {}", format_task_line(task)),
            None => println!("task: (none)"),
        }
        return Ok(());
    }

    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let selection = if args.clear {
        Selection::default()
    } else if let Some(key) = args.project.as_deref() {
        Selection {
            project_id: Some(resolve_project(store.forest(), key)?),
            task_id: None,
        }
    } else {
        let key = args.id.as_deref().unwrap_or_default();
        let id = resolve_task(store.forest(), key)?;
        let project = store
            .forest()
            .project_of(&id)
            .map(|p| p.id.clone())
            .ok_or_else(|| format!("task {} is not in any project", id))?;
        Selection::task(project, id)
    };
    store.select(selection);
    report_warnings(store);
    Ok(())
}

fn cmd_undo(ctx: &Ctx) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let label = store.undo().ok_or("nothing to undo")?;
    report_warnings(store);
    println!("undid: {}", label);
    Ok(())
}

fn cmd_redo(ctx: &Ctx) -> CmdResult {
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let label = store.redo().ok_or("nothing to redo")?;
    report_warnings(store);
    println!("redid: {}", label);
    Ok(())
}

// ---------------------------------------------------------------------------
// Generated content
// ---------------------------------------------------------------------------

fn ingest_target(forest: &Forest, args: &IngestArgs) -> Result<IngestTarget, String> {
    if let Some(parent) = args.parent.as_deref() {
        return Ok(IngestTarget::Parent(resolve_task(forest, parent)?));
    }
    let project = match args.project.as_deref() {
        Some(key) => resolve_project(forest, key)?,
        None => UNASSIGNED_ID.to_string(),
    };
    Ok(IngestTarget::Project(project))
}

fn cmd_ingest(ctx: &Ctx, args: IngestArgs) -> CmdResult {
    let text = read_input(&args.file)?;
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let target = ingest_target(store.forest(), &args)?;
    let result = store.ingest_outline(&text, &target)?;
    report_warnings(store);

    if ctx.json {
        return print_json(&ingest_to_json(&result));
    }
    for id in &result.root_ids {
        println!("{}", id);
    }
    eprintln!("ingested {} tasks", result.total_count);
    Ok(())
}

fn cmd_patch(ctx: &Ctx, args: PatchArgs) -> CmdResult {
    let proposal = PatchProposal::parse(&read_input(&args.file)?)?;
    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let id = resolve_task(store.forest(), &args.id)?;
    let outcome = store.apply_patch(&id, &proposal)?;
    report_warnings(store);

    if ctx.json {
        return print_json(&patch_to_json(&outcome));
    }
    print_lines(&format_patch_outcome(&outcome));
    Ok(())
}

// Generation can take a while, so the lock is not held while waiting. The
// reply is applied to whatever forest is current once it arrives; if the
// target was deleted meanwhile the apply step reports it.

fn cmd_expand(ctx: &Ctx, args: GenerateArgs) -> CmdResult {
    let dir = data_dir(ctx)?;
    let config = config_io::read_config(&dir)?;
    let snapshot = open_store(&dir, &config)?;
    let id = resolve_task(snapshot.forest(), &args.id)?;

    let generator = CommandGenerator::from_config(&config.generator);
    let reply = runtime()?.block_on(ai::request_expansion(
        &generator,
        snapshot.forest(),
        &id,
        args.prompt.as_deref(),
        &config.generator,
    ))?;
    drop(snapshot);

    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let result = store.ingest_outline(&reply, &IngestTarget::Parent(id))?;
    report_warnings(store);

    if ctx.json {
        return print_json(&ingest_to_json(&result));
    }
    for root in &result.root_ids {
        if let Some(task) = store.forest().task(root) {
            print_lines(&format_task_tree(store.forest(), task, 0));
        }
    }
    Ok(())
}

fn cmd_regenerate(ctx: &Ctx, args: GenerateArgs) -> CmdResult {
    let dir = data_dir(ctx)?;
    let config = config_io::read_config(&dir)?;
    let snapshot = open_store(&dir, &config)?;
    let id = resolve_task(snapshot.forest(), &args.id)?;

    let generator = CommandGenerator::from_config(&config.generator);
    let proposal = runtime()?.block_on(ai::request_patch(
        &generator,
        snapshot.forest(),
        &id,
        args.prompt.as_deref(),
        &config.generator,
    ))?;
    drop(snapshot);

    let mut locked = lock_store(ctx)?;
    let store = &mut locked.store;
    let outcome = store.apply_patch(&id, &proposal)?;
    report_warnings(store);

    if ctx.json {
        return print_json(&patch_to_json(&outcome));
    }
    print_lines(&format_patch_outcome(&outcome));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::query::fixtures::sample_forest;

    #[test]
    fn projects_resolve_by_id_or_name() {
        let forest = sample_forest();
        assert_eq!(resolve_project(&forest, "work").unwrap(), "work");
        assert_eq!(resolve_project(&forest, "WORK").unwrap(), "work");
        assert_eq!(resolve_project(&forest, "Unassigned").unwrap(), UNASSIGNED_ID);
        assert!(resolve_project(&forest, "home").unwrap_err().contains("not found"));
    }

    #[test]
    fn duplicate_project_names_need_an_id() {
        let mut forest = sample_forest();
        crate::ops::project_ops::create_project(&mut forest, "work");
        assert!(resolve_project(&forest, "Work").unwrap_err().contains("more than one"));
        assert_eq!(resolve_project(&forest, "work").unwrap(), "work");
    }

    #[test]
    fn ingest_target_prefers_parent_then_project() {
        let forest = sample_forest();
        let args = IngestArgs {
            file: "-".into(),
            parent: Some("a1x".into()),
            project: None,
        };
        assert_eq!(
            ingest_target(&forest, &args).unwrap(),
            IngestTarget::Parent("a1x".into())
        );

        let args = IngestArgs {
            file: "-".into(),
            parent: None,
            project: None,
        };
        assert_eq!(
            ingest_target(&forest, &args).unwrap(),
            IngestTarget::Project(UNASSIGNED_ID.into())
        );
    }

    #[test]
    fn unknown_task_is_reported() {
        let forest = sample_forest();
        assert_eq!(resolve_task(&forest, "zz").unwrap_err(), "task not found: zz");
    }
}
