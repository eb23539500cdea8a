use std::collections::HashSet;

use lazy_static::lazy_static;

/// Tokens excluded from topic extraction: common natural-language words
/// plus the code and editor jargon that dominates chat transcripts.
/// Tokens shorter than four characters never reach the filter.
pub const STOP_WORDS: &[&str] = &[
    // Natural language
    "about", "above", "after", "again", "against", "ahead", "allow", "allows", "almost", "along",
    "already", "also", "although", "always", "among", "another", "anything", "around", "aside",
    "because", "been", "before", "being", "below", "best", "better", "between", "both", "cannot",
    "case", "cases", "certain", "come", "comes", "could", "does", "doing", "done", "down", "each",
    "either", "else", "enough", "even", "ever", "every", "everything", "example", "exactly",
    "find", "first", "following", "from", "getting", "give", "gives", "going", "good", "great",
    "have", "having", "help", "helps", "here", "high", "however", "idea", "including", "instead",
    "into", "itself", "just", "keep", "know", "last", "less", "like", "likely", "little", "look",
    "looking", "looks", "made", "make", "makes", "making", "many", "might", "more", "most",
    "much", "must", "need", "needed", "needs", "never", "next", "nothing", "often", "once",
    "only", "other", "others", "over", "part", "place", "please", "point", "possible", "quite",
    "rather", "really", "right", "same", "several", "should", "show", "shows", "simple", "since",
    "some", "something", "still", "such", "sure", "take", "takes", "tell", "than", "thanks",
    "that", "them", "then", "there", "these", "they", "thing", "things", "think", "this",
    "those", "though", "through", "time", "times", "together", "tried", "tries", "trying",
    "under", "until", "used", "uses", "using", "very", "want", "wants", "well", "were", "what",
    "when", "where", "whether", "which", "while", "will", "with", "within", "without", "work",
    "working", "works", "would", "your",
    // Code and identifier jargon
    "argument", "arguments", "array", "arrays", "assert", "async", "await", "boolean", "branch",
    "break", "buffer", "bytes", "call", "called", "calls", "catch", "class", "classes", "client",
    "clone", "code", "command", "commands", "commit", "config", "configuration", "console",
    "const", "constant", "continue", "count", "create", "creates", "data", "debug", "default",
    "define", "defined", "delete", "directory", "enum", "error", "errors", "exception",
    "exists", "export", "exports", "false", "fetch", "field", "fields", "file", "files", "fixed",
    "folder", "function", "functions", "implement", "implementation", "implements", "import",
    "imports", "index", "input", "instance", "integer", "interface", "issue", "issues", "item",
    "items", "iterate", "json", "keys", "lambda", "library", "line", "lines", "list", "lists",
    "load", "loads", "local", "logs", "loop", "match", "method", "methods", "module", "modules",
    "name", "names", "null", "number", "numbers", "object", "objects", "option", "optional",
    "options", "output", "package", "packages", "param", "parameter", "parameters", "params",
    "parse", "path", "paths", "print", "private", "promise", "promises", "property", "props",
    "public", "query", "read", "reads", "record", "reference", "remove", "rename", "resolve",
    "resolved", "resolves", "response", "result", "results", "return", "returned", "returns",
    "root", "save", "script", "server", "sets", "static", "status", "string", "strings",
    "struct", "stuff", "switch", "test", "testing", "tests", "text", "throw", "throws",
    "token", "tokens", "true", "tuple", "type", "types", "undefined", "update", "updated",
    "updates", "util", "utils", "value", "values", "variable", "variables", "vector", "void",
    "write", "writes",
    // Editor and chat jargon
    "assistant", "breakpoint", "chat", "chats", "clipboard", "cursor", "editor", "extension",
    "extensions", "keybinding", "message", "messages", "model", "models", "palette", "panel",
    "panels", "prompt", "prompts", "request", "requests", "session", "sessions", "settings",
    "sidebar", "snippet", "snippets", "tabs", "terminal", "theme", "themes", "timestamp",
    "user", "users", "window", "windows", "workspace",
];

lazy_static! {
    static ref STOP_SET: HashSet<&'static str> = STOP_WORDS.iter().copied().collect();
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_SET.contains(word)
}
