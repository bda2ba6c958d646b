//! Immutable marker tables consulted by the backends.
//!
//! Every role table is an ordered slice evaluated top to bottom; the first
//! match wins. Never replace these with maps: a file carrying two markers must
//! always resolve to the same role.

use crate::model::{HttpMethod, Role};

/// First entry in `table` whose marker satisfies `pred`.
pub fn first_match<'a, T: Copy>(table: &'a [(&'a str, T)], mut pred: impl FnMut(&str) -> bool) -> Option<T> {
    table.iter().find(|(marker, _)| pred(marker)).map(|(_, v)| *v)
}

// ---------------------------------------------------------------------------
// Java / Spring
// ---------------------------------------------------------------------------

pub const JAVA_ROLE_MARKERS: &[(&str, Role)] = &[
    ("RestController", Role::Controller),
    ("Controller", Role::Controller),
    ("RestControllerAdvice", Role::Exception),
    ("ControllerAdvice", Role::Exception),
    ("Service", Role::Service),
    ("Repository", Role::Repository),
    ("Entity", Role::Entity),
    ("Table", Role::Entity),
    ("Document", Role::Entity),
    ("Embeddable", Role::Entity),
    ("MappedSuperclass", Role::Entity),
    ("SpringBootApplication", Role::Configuration),
    ("Configuration", Role::Configuration),
    ("ConfigurationProperties", Role::Configuration),
];

/// Suffix fallback when no marker annotation matched.
pub const JAVA_NAME_SUFFIXES: &[(&str, Role)] = &[
    ("Controller", Role::Controller),
    ("Resource", Role::Controller),
    ("ServiceImpl", Role::Service),
    ("Service", Role::Service),
    ("Repository", Role::Repository),
    ("Dao", Role::Repository),
    ("Dto", Role::Dto),
    ("DTO", Role::Dto),
    ("Request", Role::Dto),
    ("Response", Role::Dto),
    ("Configuration", Role::Configuration),
    ("Config", Role::Configuration),
    ("Listener", Role::Listener),
    ("Consumer", Role::Listener),
    ("Subscriber", Role::Listener),
    ("Utils", Role::Utility),
    ("Util", Role::Utility),
    ("Helper", Role::Utility),
    ("Exception", Role::Exception),
    ("Error", Role::Exception),
];

/// Role markers that make the declaring type externally reachable.
pub const JAVA_ENTRY_ROLE_MARKERS: &[&str] = &["RestController", "Controller"];

/// Markers that make a file an entry point wherever they appear.
pub const JAVA_ENTRY_MARKERS: &[&str] = &[
    "KafkaListener",
    "RabbitListener",
    "JmsListener",
    "SqsListener",
    "StreamListener",
    "EventListener",
    "TransactionalEventListener",
    "Scheduled",
    "SpringBootApplication",
    "MessageMapping",
];

/// Entry markers that also imply the LISTENER role for otherwise unclassified types.
pub const JAVA_LISTENER_MARKERS: &[&str] = &[
    "KafkaListener",
    "RabbitListener",
    "JmsListener",
    "SqsListener",
    "StreamListener",
    "EventListener",
    "TransactionalEventListener",
];

/// `RequestMapping` is absent on purpose: its verb comes from the `method` attribute.
pub const JAVA_HTTP_MARKERS: &[(&str, HttpMethod)] = &[
    ("GetMapping", HttpMethod::Get),
    ("PostMapping", HttpMethod::Post),
    ("PutMapping", HttpMethod::Put),
    ("DeleteMapping", HttpMethod::Delete),
    ("PatchMapping", HttpMethod::Patch),
];

pub const JAVA_GENERIC_MAPPING: &str = "RequestMapping";

/// Lines scanned above a member declaration for its routing annotation.
pub const JAVA_ANNOTATION_LOOKBACK: usize = 5;

pub const JAVA_MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "synchronized",
    "native",
    "default",
    "strictfp",
    "transient",
    "volatile",
    "sealed",
    "non-sealed",
];

/// Tokens that look like `name(` but never start a member declaration.
pub const JAVA_NON_MEMBER_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "else", "throw", "try", "do",
    "synchronized", "super", "this", "assert", "case",
];

// ---------------------------------------------------------------------------
// TypeScript / JavaScript
// ---------------------------------------------------------------------------

pub const SCRIPT_DECORATOR_ROLES: &[(&str, Role)] = &[
    ("Controller", Role::Controller),
    ("Resolver", Role::Controller),
    ("WebSocketGateway", Role::Controller),
    ("Processor", Role::Listener),
    ("EventsHandler", Role::Listener),
    ("CommandHandler", Role::Listener),
    ("Catch", Role::Exception),
    ("Entity", Role::Entity),
    ("Schema", Role::Entity),
    ("EntityRepository", Role::Repository),
    ("Module", Role::Configuration),
    ("Injectable", Role::Service),
];

pub const SCRIPT_ENTRY_CLASS_DECORATORS: &[&str] = &[
    "Controller",
    "Resolver",
    "WebSocketGateway",
    "Processor",
    "EventsHandler",
    "CommandHandler",
];

pub const SCRIPT_ENTRY_MEMBER_DECORATORS: &[&str] = &[
    "Cron",
    "Interval",
    "Timeout",
    "OnEvent",
    "MessagePattern",
    "EventPattern",
    "Process",
    "SubscribeMessage",
];

pub const SCRIPT_VERB_DECORATORS: &[(&str, HttpMethod)] = &[
    ("Get", HttpMethod::Get),
    ("Post", HttpMethod::Post),
    ("Put", HttpMethod::Put),
    ("Patch", HttpMethod::Patch),
    ("Delete", HttpMethod::Delete),
    ("Options", HttpMethod::Options),
    ("Head", HttpMethod::Head),
    ("All", HttpMethod::All),
];

/// Filename segments (split on `.`, `-`, `_`) mapped to roles.
pub const SCRIPT_FILENAME_ROLES: &[(&str, Role)] = &[
    ("controller", Role::Controller),
    ("routes", Role::Controller),
    ("route", Role::Controller),
    ("handler", Role::Controller),
    ("service", Role::Service),
    ("repository", Role::Repository),
    ("repo", Role::Repository),
    ("entity", Role::Entity),
    ("model", Role::Entity),
    ("schema", Role::Entity),
    ("dto", Role::Dto),
    ("config", Role::Configuration),
    ("module", Role::Configuration),
    ("listener", Role::Listener),
    ("subscriber", Role::Listener),
    ("consumer", Role::Listener),
    ("utils", Role::Utility),
    ("util", Role::Utility),
    ("helpers", Role::Utility),
    ("helper", Role::Utility),
    ("error", Role::Exception),
    ("exception", Role::Exception),
];

/// Well-known process entry file stems. `index` only counts at the source-root top level.
pub const SCRIPT_ENTRY_FILE_STEMS: &[&str] = &["main", "server", "app"];
pub const SCRIPT_ROOT_ENTRY_FILE_STEM: &str = "index";

pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

pub const ROUTER_RECEIVERS: &[&str] = &["app", "router", "server", "fastify", "api", "routes"];
pub const ROUTER_VERBS: &[&str] = &[
    "get", "post", "put", "patch", "delete", "options", "head", "all", "use", "route",
];

/// File stem that marks a file-convention route handler.
pub const ROUTE_FILE_STEM: &str = "route";
/// Directories under which file-convention routing applies, most specific first.
pub const ROUTE_CONVENTION_ROOTS: &[&str] = &["src/app", "app"];

pub const FEATURE_DECORATORS: &str = "decorators";
pub const FEATURE_STATIC_TYPING: &str = "static-typing";
pub const FEATURE_DECORATOR_ROUTING: &str = "decorator-routing";
pub const FEATURE_FILE_ROUTING: &str = "file-routing";
pub const FEATURE_CALL_ROUTING: &str = "call-routing";

/// One framework the scripting backend knows how to read.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkPattern {
    pub name: &'static str,
    /// Any of these declared dependencies selects the framework.
    pub dependencies: &'static [&'static str],
    pub source_root: &'static str,
    pub features: &'static [&'static str],
}

/// Detection precedence: first pattern with a declared dependency wins.
pub const FRAMEWORKS: &[FrameworkPattern] = &[
    FrameworkPattern {
        name: "nestjs",
        dependencies: &["@nestjs/core", "@nestjs/common"],
        source_root: "src",
        features: &[FEATURE_DECORATORS, FEATURE_STATIC_TYPING, FEATURE_DECORATOR_ROUTING],
    },
    FrameworkPattern {
        name: "nextjs",
        dependencies: &["next"],
        source_root: ".",
        features: &[FEATURE_FILE_ROUTING],
    },
    FrameworkPattern {
        name: "express",
        dependencies: &["express"],
        source_root: "src",
        features: &[FEATURE_CALL_ROUTING],
    },
    FrameworkPattern {
        name: "fastify",
        dependencies: &["fastify"],
        source_root: "src",
        features: &[FEATURE_CALL_ROUTING],
    },
    FrameworkPattern {
        name: "koa",
        dependencies: &["koa", "@koa/router"],
        source_root: "src",
        features: &[FEATURE_CALL_ROUTING],
    },
];

pub const UNKNOWN_FRAMEWORK: &str = "unknown";
pub const UNKNOWN_FRAMEWORK_ROOT: &str = "src";

// ---------------------------------------------------------------------------
// Go
// ---------------------------------------------------------------------------

pub const GO_NAME_SUFFIXES: &[(&str, Role)] = &[
    ("Handler", Role::Controller),
    ("Controller", Role::Controller),
    ("Service", Role::Service),
    ("Repository", Role::Repository),
    ("Repo", Role::Repository),
    ("Store", Role::Repository),
    ("Model", Role::Entity),
    ("Entity", Role::Entity),
    ("Request", Role::Dto),
    ("Response", Role::Dto),
    ("DTO", Role::Dto),
    ("Dto", Role::Dto),
    ("Config", Role::Configuration),
    ("Listener", Role::Listener),
    ("Consumer", Role::Listener),
    ("Subscriber", Role::Listener),
    ("Error", Role::Exception),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_respects_table_order() {
        // Both "RestController" and "Controller" qualify; the earlier row wins.
        let markers = ["Controller", "RestController"];
        let role = first_match(JAVA_ROLE_MARKERS, |m| markers.contains(&m));
        assert_eq!(role, Some(Role::Controller));

        let markers = ["Service", "Repository"];
        let role = first_match(JAVA_ROLE_MARKERS, |m| markers.contains(&m));
        assert_eq!(role, Some(Role::Service));
    }

    #[test]
    fn suffix_table_prefers_specific_rows() {
        let role = first_match(JAVA_NAME_SUFFIXES, |s| "UserServiceImpl".ends_with(s));
        assert_eq!(role, Some(Role::Service));
        let role = first_match(JAVA_NAME_SUFFIXES, |s| "AppConfiguration".ends_with(s));
        assert_eq!(role, Some(Role::Configuration));
    }

    #[test]
    fn framework_precedence_is_fixed() {
        let names: Vec<&str> = FRAMEWORKS.iter().map(|f| f.name).collect();
        assert_eq!(names, ["nestjs", "nextjs", "express", "fastify", "koa"]);
    }
}
