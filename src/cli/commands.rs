use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scopes", about = concat!("scopes v", env!("CARGO_PKG_VERSION"), " - nested plans that grow themselves"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a .scopes workspace in the current directory
    Init(InitArgs),
    /// List projects with task counts
    Projects,
    /// Project management
    Project(ProjectCmd),
    /// Show the task tree of one project, or of all of them
    List(ListArgs),
    /// Show task details
    Show(IdArg),
    /// Print a task's subtree as an indented outline
    Export(IdArg),
    /// Add a root task to a project (default: Unassigned)
    Add(AddArgs),
    /// Add subtasks under a task
    Sub(SubArgs),
    /// Change a task's text, description or status
    Edit(EditArgs),
    /// Delete tasks with their subtrees
    Rm(RmArgs),
    /// Move a task and its subtree to another project as a new root
    Mv(MvArgs),
    /// Detach a subtask and make it a root of its project
    Promote(IdArg),
    /// Move a task to a position among its siblings
    Reorder(ReorderArgs),
    /// Ingest an outline (JSON or indented text) from a file or stdin
    Ingest(IngestArgs),
    /// Apply a replacement proposal to a task from a file or stdin
    Patch(PatchArgs),
    /// Generate subtasks for a task
    Expand(GenerateArgs),
    /// Regenerate a task's subtree
    Regenerate(GenerateArgs),
    /// Comment threads on a task
    Comment(CommentCmd),
    /// Record the output of running a task
    #[command(name = "result")]
    Record(ResultArgs),
    /// Prepend a summary to a task or project
    Summary(SummaryArgs),
    /// Undo the last change
    Undo,
    /// Redo the last undone change
    Redo,
    /// Show the undo and redo stacks
    History,
    /// Search tasks by regex
    Search(SearchArgs),
    /// Validate forest integrity
    Check,
    /// Show or change the selected project and task
    Select(SelectArgs),
}

// ---------------------------------------------------------------------------
// Shared args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Reset an existing .scopes/ to an empty forest with no history
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct IdArg {
    /// Task id (or unique prefix)
    pub id: String,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project
    Add(ProjectAddArgs),
    /// Rename a project
    Rename(ProjectRenameArgs),
    /// Delete a project; its tasks move to Unassigned
    Rm(ProjectRefArg),
    /// Pin a project (or unpin with --off)
    Pin(ProjectPinArgs),
    /// Set or clear a project description
    Describe(ProjectDescribeArgs),
}

#[derive(Args)]
pub struct ProjectAddArgs {
    /// Project name
    pub name: String,
}

#[derive(Args)]
pub struct ProjectRefArg {
    /// Project id or name
    pub project: String,
}

#[derive(Args)]
pub struct ProjectRenameArgs {
    /// Project id or name
    pub project: String,
    /// New name
    pub name: String,
}

#[derive(Args)]
pub struct ProjectPinArgs {
    /// Project id or name
    pub project: String,
    /// Unpin instead
    #[arg(long)]
    pub off: bool,
}

#[derive(Args)]
pub struct ProjectDescribeArgs {
    /// Project id or name
    pub project: String,
    /// Description text (omit to clear)
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Project id or name (default: all projects)
    pub project: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern to search for
    pub pattern: String,
    /// Limit search to one project
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Task to select (omit to show the current selection)
    pub id: Option<String>,
    /// Select a project without a task
    #[arg(long, conflicts_with = "id")]
    pub project: Option<String>,
    /// Clear the selection
    #[arg(long, conflicts_with_all = ["id", "project"])]
    pub clear: bool,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Project id or name
    #[arg(long, short)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct SubArgs {
    /// Parent task id
    pub id: String,
    /// Subtask texts, one subtask each
    #[arg(required = true)]
    pub texts: Vec<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id
    pub id: String,
    /// New text
    #[arg(long)]
    pub text: Option<String>,
    /// New description
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    /// Remove the description
    #[arg(long)]
    pub clear_description: bool,
    /// New status (todo, inprogress, done); leaves only
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task ids
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task id
    pub id: String,
    /// Target project id or name
    pub project: String,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// Task id
    pub id: String,
    /// New position among siblings (0-indexed)
    pub position: usize,
}

#[derive(Args)]
pub struct IngestArgs {
    /// File to read, or - for stdin
    pub file: String,
    /// Insert under this task
    #[arg(long, conflicts_with = "project")]
    pub parent: Option<String>,
    /// Insert as new roots of this project (default: Unassigned)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct PatchArgs {
    /// Task to replace
    pub id: String,
    /// File holding the proposal JSON, or - for stdin
    pub file: String,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Task id
    pub id: String,
    /// Extra instructions for the generator
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(Args)]
pub struct CommentCmd {
    #[command(subcommand)]
    pub action: CommentAction,
}

#[derive(Subcommand)]
pub enum CommentAction {
    /// Start a thread
    Add(CommentAddArgs),
    /// Reply to a comment
    Reply(CommentReplyArgs),
    /// Change a comment's text
    Edit(CommentReplyArgs),
    /// Set a comment's status (active, accepted, rejected)
    Resolve(CommentResolveArgs),
    /// Delete a comment and its replies
    Rm(CommentRefArgs),
}

#[derive(Args)]
pub struct CommentAddArgs {
    /// Task id
    pub id: String,
    /// Comment text
    pub text: String,
}

#[derive(Args)]
pub struct CommentReplyArgs {
    /// Task id
    pub id: String,
    /// Comment id
    pub comment: String,
    /// Text
    pub text: String,
}

#[derive(Args)]
pub struct CommentResolveArgs {
    /// Task id
    pub id: String,
    /// Comment id
    pub comment: String,
    /// New status
    pub status: String,
}

#[derive(Args)]
pub struct CommentRefArgs {
    /// Task id
    pub id: String,
    /// Comment id
    pub comment: String,
}

#[derive(Args)]
pub struct ResultArgs {
    /// Task id
    pub id: String,
    /// Output text
    pub output: String,
}

#[derive(Args)]
pub struct SummaryArgs {
    /// Task id, or project id or name with --project
    pub target: String,
    /// Summary text
    pub text: String,
    /// Summarize a project instead of a task
    #[arg(long)]
    pub project: bool,
}
