use std::collections::BTreeMap;

use crate::settings::LangAliases;

/// Language key to syntax aliases, as found under `Packages/`.
const BUILTIN: &[(&str, &[&str])] = &[
    ("actionscript", &["ActionScript/ActionScript"]),
    ("applescript", &["AppleScript/AppleScript"]),
    ("asp", &["ASP/ASP"]),
    ("bash", &["ShellScript/Bash", "ShellScript/Shell-Unix-Generic", "ShellScript/Zsh"]),
    ("bat", &["Batch File/Batch File"]),
    ("c", &["C++/C"]),
    ("clojure", &["Clojure/Clojure"]),
    ("cpp", &["C++/C++"]),
    ("csharp", &["C#/C#"]),
    ("css", &["CSS/CSS"]),
    ("d", &["D/D"]),
    ("diff", &["Diff/Diff"]),
    ("erlang", &["Erlang/Erlang"]),
    ("go", &["Go/Go"]),
    ("graphviz", &["Graphviz/DOT"]),
    ("groovy", &["Groovy/Groovy"]),
    ("haskell", &["Haskell/Haskell"]),
    ("html", &["HTML/HTML"]),
    ("html+erb", &["Rails/HTML (Rails)"]),
    ("ini", &["INI/INI"]),
    ("java", &["Java/Java"]),
    ("javascript", &["JavaScript/JavaScript", "JavaScript/Regular Expressions (Javascript)"]),
    ("json", &["JavaScript/JSON", "JSON/JSON"]),
    ("jsp", &["Java/Java Server Pages (JSP)"]),
    ("latex", &["LaTeX/LaTeX"]),
    ("less", &["LESS/LESS"]),
    ("lisp", &["Lisp/Lisp"]),
    ("lua", &["Lua/Lua"]),
    ("makefile", &["Makefile/Makefile"]),
    ("markdown", &["Markdown/Markdown", "Markdown/MultiMarkdown"]),
    ("matlab", &["Matlab/Matlab"]),
    ("objective-c", &["Objective-C/Objective-C"]),
    ("objective-c++", &["Objective-C/Objective-C++"]),
    ("ocaml", &["OCaml/OCaml"]),
    ("perl", &["Perl/Perl"]),
    ("php", &["PHP/PHP", "PHP/PHP Source"]),
    ("powershell", &["PowerShell/PowerShell"]),
    ("python", &["Python/Python"]),
    ("r", &["R/R"]),
    ("rst", &["RestructuredText/reStructuredText"]),
    ("ruby", &["Ruby/Ruby"]),
    ("haml", &["Rails/Ruby Haml"]),
    ("rust", &["Rust/Rust"]),
    ("sass", &["Sass/Sass"]),
    ("scala", &["Scala/Scala"]),
    ("scss", &["Sass/SCSS"]),
    ("sql", &["SQL/SQL"]),
    ("swift", &["Swift/Swift"]),
    ("tcl", &["TCL/Tcl"]),
    ("toml", &["TOML/TOML"]),
    ("typescript", &["TypeScript/TypeScript"]),
    ("tsx", &["TypeScript/TypeScriptReact"]),
    ("xml", &["XML/XML"]),
    ("xslt", &["XML/XSL"]),
    ("yaml", &["YAML/YAML"]),
];

/// Finds the language key whose syntax aliases contain `syntax_path`.
///
/// `syntax_path` is normalized by dropping a leading `Packages/` and the file
/// extension. User entries are searched before the built-in table.
pub fn language_for_syntax(
    syntax_path: &str,
    user_map: &BTreeMap<String, LangAliases>,
) -> Option<String> {
    let syntax = normalize(syntax_path);
    for (key, (_, syntaxes)) in user_map {
        if syntaxes.iter().any(|alias| alias == syntax) {
            return Some(key.clone());
        }
    }
    BUILTIN
        .iter()
        .find(|(_, syntaxes)| syntaxes.contains(&syntax))
        .map(|(key, _)| key.to_string())
}

fn normalize(path: &str) -> &str {
    let path = path.strip_prefix("Packages/").unwrap_or(path);
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    }
}
