use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, alias = "id_usuario")]
    pub id: String,
    #[serde(default, alias = "nombre_completo")]
    pub full_name: String,
    #[serde(default, alias = "correo")]
    pub email: String,
    /// `sha256$<salt>$<digest>`, or plaintext on records written by older clients
    #[serde(default, alias = "contraseña", alias = "password")]
    pub password_hash: String,
    #[serde(default, alias = "carrera")]
    pub program: String,
    /// Cache of the groups this user belongs to. Groups are authoritative.
    #[serde(default, alias = "grupos")]
    pub group_ids: Vec<String>,
    #[serde(default, alias = "descripcion_personal")]
    pub bio: String,
}

/// Fields a profile update may change; `None` or empty leaves the field as is
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub program: Option<String>,
    pub bio: Option<String>,
}

/// Canonical form of an email used for comparisons
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Store key for a user: the normalized email with `_`, `@` and `.` spelled
/// out as `_us_`, `_at_` and `_dot_`. Every `_` in a key starts one of those
/// escapes, so distinct emails never share a key.
pub fn email_key(email: &str) -> String {
    let email = normalize_email(email);
    let mut key = String::with_capacity(email.len() + 8);
    for c in email.chars() {
        match c {
            '_' => key.push_str("_us_"),
            '@' => key.push_str("_at_"),
            '.' => key.push_str("_dot_"),
            other => key.push(other),
        }
    }
    key
}

/// Inverse of [`email_key`]; `None` when `key` holds an unknown escape
pub fn email_from_key(key: &str) -> Option<String> {
    let mut email = String::with_capacity(key.len());
    let mut rest = key;
    while let Some(start) = rest.find('_') {
        email.push_str(&rest[..start]);
        let escape = &rest[start + 1..];
        let end = escape.find('_')?;
        email.push(match &escape[..end] {
            "us" => '_',
            "at" => '@',
            "dot" => '.',
            _ => return None,
        });
        rest = &escape[end + 1..];
    }
    email.push_str(rest);
    Some(email)
}

impl User {
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }

    /// Add a group id to the cache; false when already present
    pub fn link_group(&mut self, group_id: &str) -> bool {
        if self.group_ids.iter().any(|g| g == group_id) {
            return false;
        }
        self.group_ids.push(group_id.to_string());
        true
    }

    /// Remove a group id from the cache; false when it was not there
    pub fn unlink_group(&mut self, group_id: &str) -> bool {
        let before = self.group_ids.len();
        self.group_ids.retain(|g| g != group_id);
        before != self.group_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_keys_are_path_safe_and_reversible() {
        let key = email_key(" Ana.Perez@UNAL.edu.co ");
        assert_eq!(key, "ana_dot_perez_at_unal_dot_edu_dot_co");
        assert!(crate::store::is_valid_segment(&key));
        assert_eq!(email_from_key(&key).as_deref(), Some("ana.perez@unal.edu.co"));
    }

    #[test]
    fn underscores_do_not_collide_with_escapes() {
        let dotted = email_key("x.y@unal.edu.co");
        let spelled = email_key("x_dot_y@unal.edu.co");
        assert_ne!(dotted, spelled);
        assert_eq!(spelled, "x_us_dot_us_y_at_unal_dot_edu_dot_co");
        assert_eq!(email_from_key(&spelled).as_deref(), Some("x_dot_y@unal.edu.co"));
        assert_eq!(email_from_key(&dotted).as_deref(), Some("x.y@unal.edu.co"));
    }

    #[test]
    fn rejects_malformed_keys() {
        assert_eq!(email_from_key("a_hash_b"), None);
        assert_eq!(email_from_key("a_at"), None);
        assert_eq!(email_from_key("plain").as_deref(), Some("plain"));
    }

    #[test]
    fn reads_legacy_user_document() {
        let raw = serde_json::json!({
            "id_usuario": "u-1",
            "nombre_completo": "Nestor",
            "correo": "nestor@unal.edu.co",
            "contraseña": "123456",
            "carrera": "Medicina"
        });
        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.full_name, "Nestor");
        assert_eq!(user.password_hash, "123456");
        assert!(user.group_ids.is_empty());
        assert_eq!(user.bio, "");
    }

    #[test]
    fn group_cache_is_a_set() {
        let mut user: User = serde_json::from_value(serde_json::json!({
            "email": "a@unal.edu.co"
        }))
        .unwrap();
        assert!(user.link_group("chess"));
        assert!(!user.link_group("chess"));
        assert!(user.unlink_group("chess"));
        assert!(!user.unlink_group("chess"));
        assert_eq!(user.display_name(), "a@unal.edu.co");
    }
}
