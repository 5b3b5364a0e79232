//! Wire vocabulary.
//!
//! These IRIs are part of the interoperability contract with third-party
//! storage providers and must stay bit-exact.

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

pub mod foaf {
    pub const NS: &str = "http://xmlns.com/foaf/0.1/";

    /// Class of all agents; used as the "public" principal.
    pub const AGENT: &str = "http://xmlns.com/foaf/0.1/Agent";
}

pub mod ldp {
    pub const NS: &str = "http://www.w3.org/ns/ldp#";

    pub const CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
}

pub mod acl {
    pub const NS: &str = "http://www.w3.org/ns/auth/acl#";

    pub const AUTHORIZATION: &str = "http://www.w3.org/ns/auth/acl#Authorization";
    pub const AGENT: &str = "http://www.w3.org/ns/auth/acl#agent";
    pub const AGENT_CLASS: &str = "http://www.w3.org/ns/auth/acl#agentClass";
    pub const AGENT_GROUP: &str = "http://www.w3.org/ns/auth/acl#agentGroup";
    pub const ORIGIN: &str = "http://www.w3.org/ns/auth/acl#origin";
    pub const ACCESS_TO: &str = "http://www.w3.org/ns/auth/acl#accessTo";
    pub const DEFAULT: &str = "http://www.w3.org/ns/auth/acl#default";
    pub const MODE: &str = "http://www.w3.org/ns/auth/acl#mode";

    pub const READ: &str = "http://www.w3.org/ns/auth/acl#Read";
    pub const WRITE: &str = "http://www.w3.org/ns/auth/acl#Write";
    pub const APPEND: &str = "http://www.w3.org/ns/auth/acl#Append";
    pub const CONTROL: &str = "http://www.w3.org/ns/auth/acl#Control";
}

pub mod acp {
    pub const NS: &str = "http://www.w3.org/ns/solid/acp#";

    pub const ACCESS_CONTROL_RESOURCE: &str =
        "http://www.w3.org/ns/solid/acp#AccessControlResource";
    pub const ACCESS_CONTROL: &str = "http://www.w3.org/ns/solid/acp#AccessControl";
    pub const POLICY: &str = "http://www.w3.org/ns/solid/acp#Policy";
    pub const MATCHER: &str = "http://www.w3.org/ns/solid/acp#Matcher";

    pub const RESOURCE: &str = "http://www.w3.org/ns/solid/acp#resource";
    pub const ACCESS_CONTROL_LINK: &str = "http://www.w3.org/ns/solid/acp#accessControl";
    pub const MEMBER_ACCESS_CONTROL: &str = "http://www.w3.org/ns/solid/acp#memberAccessControl";
    pub const ACCESS: &str = "http://www.w3.org/ns/solid/acp#access";
    pub const APPLY: &str = "http://www.w3.org/ns/solid/acp#apply";
    pub const ALLOW: &str = "http://www.w3.org/ns/solid/acp#allow";
    pub const ALL_OF: &str = "http://www.w3.org/ns/solid/acp#allOf";
    pub const ANY_OF: &str = "http://www.w3.org/ns/solid/acp#anyOf";
    pub const AGENT: &str = "http://www.w3.org/ns/solid/acp#agent";

    pub const PUBLIC_AGENT: &str = "http://www.w3.org/ns/solid/acp#PublicAgent";
}

pub mod media_type {
    pub const TURTLE: &str = "text/turtle";
    pub const SPARQL_UPDATE: &str = "application/sparql-update";
}
