//! GRANT/REVOKE statement rendering
//!
//! Nothing here is bound as a query parameter (MariaDB does not accept
//! placeholders for identifiers), so every piece of a descriptor is either
//! quoted or validated before it reaches the server.

use mariadb_common::crd::GrantDescriptor;
use mariadb_common::ExternalEffectError;

/// Host part of every account the operator manages
pub const ACCOUNT_HOST: &str = "%";

/// `GRANT <privs> ON <db>.<table> TO '<user>'@'%' [WITH GRANT OPTION]`
pub fn grant_statement(grant: &GrantDescriptor) -> Result<String, ExternalEffectError> {
    let mut sql = format!(
        "GRANT {} ON {} TO {}",
        privileges(&grant.privileges)?,
        scope(&grant.database, &grant.table)?,
        account(&grant.username)?
    );
    if grant.grant_option {
        sql.push_str(" WITH GRANT OPTION");
    }
    Ok(sql)
}

/// `REVOKE <privs>[, GRANT OPTION] ON <db>.<table> FROM '<user>'@'%'`
pub fn revoke_statement(grant: &GrantDescriptor) -> Result<String, ExternalEffectError> {
    let mut privs = privileges(&grant.privileges)?;
    if grant.grant_option {
        privs.push_str(", GRANT OPTION");
    }
    Ok(format!(
        "REVOKE {} ON {} FROM {}",
        privs,
        scope(&grant.database, &grant.table)?,
        account(&grant.username)?
    ))
}

fn privileges(privileges: &[String]) -> Result<String, ExternalEffectError> {
    if privileges.is_empty() {
        return Err(invalid("at least one privilege is required"));
    }
    let mut rendered = Vec::with_capacity(privileges.len());
    for privilege in privileges {
        let privilege = privilege.trim();
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '(' | ')' | ',');
        if privilege.is_empty() || !privilege.chars().all(allowed) {
            return Err(invalid(format!("invalid privilege {privilege:?}")));
        }
        rendered.push(privilege.to_ascii_uppercase());
    }
    Ok(rendered.join(", "))
}

fn scope(database: &str, table: &str) -> Result<String, ExternalEffectError> {
    Ok(format!("{}.{}", identifier(database)?, identifier(table)?))
}

fn identifier(name: &str) -> Result<String, ExternalEffectError> {
    match name {
        "" => Err(invalid("database and table must not be empty")),
        "*" => Ok("*".to_string()),
        name => Ok(format!("`{}`", name.replace('`', "``"))),
    }
}

fn account(username: &str) -> Result<String, ExternalEffectError> {
    if username.is_empty() {
        return Err(invalid("username must not be empty"));
    }
    Ok(format!("{}@{}", string_literal(username), string_literal(ACCOUNT_HOST)))
}

fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn invalid(msg: impl Into<String>) -> ExternalEffectError {
    ExternalEffectError::Permanent(msg.into())
}
