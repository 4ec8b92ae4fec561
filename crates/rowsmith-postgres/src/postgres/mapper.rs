use rowsmith_core::{
    Column, ColumnType, ForeignKey, GeneratedExpression, IdentityGeneration, PrimaryKey,
};

use super::queries::{RawColumn, RawForeignKey, RawKeyColumn};

pub fn map_columns(raw: Vec<RawColumn>) -> Vec<Column> {
    raw.into_iter()
        .map(|col| Column {
            ordinal_position: col.ordinal_position,
            name: col.name,
            column_type: ColumnType {
                data_type: col.data_type,
                udt_name: col.udt_name,
                character_max_length: col.character_max_length,
            },
            is_nullable: col.is_nullable,
            generated: col.is_generated.then(|| GeneratedExpression {
                expression: col.default_expr.clone(),
            }),
            // generation expressions live in pg_attrdef too; they are not defaults
            default: if col.is_generated {
                None
            } else {
                col.default_expr
            },
            identity: col.identity.as_deref().and_then(IdentityGeneration::from_catalog),
        })
        .collect()
}

pub fn map_primary_key(raw: Vec<RawKeyColumn>) -> Option<PrimaryKey> {
    let name = raw.first().map(|key| key.constraint_name.clone())?;
    Some(PrimaryKey {
        name: Some(name),
        columns: raw.into_iter().map(|key| key.column_name).collect(),
    })
}

/// One entry per column pair; composite keys become several single-column keys.
pub fn map_foreign_keys(raw: Vec<RawForeignKey>) -> Vec<ForeignKey> {
    raw.into_iter()
        .map(|fk| ForeignKey {
            name: Some(fk.constraint_name),
            column: fk.column_name,
            referenced_schema: fk.referenced_schema,
            referenced_table: fk.referenced_table,
            referenced_column: fk.referenced_column,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_column(name: &str) -> RawColumn {
        RawColumn {
            ordinal_position: 1,
            name: name.to_string(),
            data_type: "integer".to_string(),
            udt_name: "int4".to_string(),
            is_nullable: false,
            default_expr: None,
            identity: None,
            is_generated: false,
            character_max_length: None,
        }
    }

    #[test]
    fn generated_expression_is_not_a_default() {
        let mut total = raw_column("total");
        total.is_generated = true;
        total.default_expr = Some("(price * qty)".to_string());
        let mut id = raw_column("id");
        id.identity = Some("a".to_string());

        let columns = map_columns(vec![id, total]);
        assert_eq!(columns[0].identity, Some(IdentityGeneration::Always));
        assert!(columns[0].is_computed());
        assert_eq!(columns[1].default, None);
        assert_eq!(
            columns[1].generated.as_ref().and_then(|g| g.expression.as_deref()),
            Some("(price * qty)")
        );
        assert!(columns[1].is_computed());
    }

    #[test]
    fn primary_key_keeps_column_order() {
        let raw = ["tenant_id", "id"]
            .into_iter()
            .map(|column| RawKeyColumn {
                constraint_name: "memberships_pkey".to_string(),
                column_name: column.to_string(),
            })
            .collect();
        let pk = map_primary_key(raw).unwrap();
        assert_eq!(pk.name.as_deref(), Some("memberships_pkey"));
        assert_eq!(pk.columns, vec!["tenant_id", "id"]);
        assert!(map_primary_key(Vec::new()).is_none());
    }
}
