use chrono::NaiveDate;
use sqlparser::ast::{
    self, Expr, FunctionArg, FunctionArgExpr, FunctionArguments, ObjectNamePart, SelectItem,
    SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use thiserror::Error;
use ulid::Ulid;

use crate::model::*;

/// Parsed command from one console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    InsertHotel(HotelDraft),
    SetRoomCapacity {
        hotel_id: Ulid,
        entries: Vec<CapacityEntry>,
    },
    InsertReservation(NewReservation),
    ReserveCapacity {
        hotel_id: Ulid,
        size: RoomSize,
        quantity: i64,
    },
    ReleaseCapacity {
        hotel_id: Ulid,
        size: RoomSize,
        quantity: i64,
    },
    AddExtraRoom {
        reservation_id: Ulid,
        quantity: i64,
    },
    CancelReservation {
        reservation_id: Ulid,
    },
    CompleteReservation {
        reservation_id: Ulid,
    },
    SelectHotels,
    SelectAvailableRooms,
    SelectRoomCapacity {
        hotel_id: Ulid,
    },
    SelectReservationRooms {
        reservation_id: Ulid,
    },
    SelectGuestReservations {
        guest_id: Ulid,
    },
    SelectReservation {
        id: Ulid,
    },
    SelectEventTypes,
}

impl Command {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::InsertHotel(_)
                | Command::SetRoomCapacity { .. }
                | Command::InsertReservation(_)
                | Command::ReserveCapacity { .. }
                | Command::ReleaseCapacity { .. }
                | Command::AddExtraRoom { .. }
                | Command::CancelReservation { .. }
                | Command::CompleteReservation { .. }
        )
    }
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    match stmts.as_slice() {
        [] => Err(SqlError::Empty),
        [Statement::Insert(insert)] => parse_insert(insert),
        [Statement::Query(query)] => parse_select(query),
        [other] => Err(SqlError::Unsupported(format!("{other}"))),
        _ => Err(SqlError::Unsupported("one statement per line".into())),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let rows = extract_insert_rows(insert)?;

    match table.as_str() {
        "hotels" => {
            let values = single_row("hotels", rows)?;
            if values.is_empty() || values.len() > 6 {
                return Err(SqlError::WrongArity("hotels", 6, values.len()));
            }
            let mut fields = values.iter().map(parse_string).collect::<Result<Vec<_>, _>>()?;
            fields.resize(6, String::new());
            let mut fields = fields.into_iter();
            let mut next = || fields.next().unwrap_or_default();
            Ok(Command::InsertHotel(HotelDraft {
                name: next(),
                address: next(),
                state: next(),
                zip_code: next(),
                website: next(),
                phone: next(),
            }))
        }
        "room_capacity" => {
            let mut hotel_id = None;
            let mut entries = Vec::with_capacity(rows.len());
            for (i, row) in rows.iter().enumerate() {
                if row.len() != 4 {
                    return Err(SqlError::WrongArity("room_capacity row", 4, row.len()));
                }
                let row_hotel = parse_ulid(&row[0]).map_err(|e| e.in_row(i))?;
                match hotel_id {
                    None => hotel_id = Some(row_hotel),
                    Some(h) if h != row_hotel => {
                        return Err(SqlError::Parse("all room_capacity rows must target the same hotel".into()));
                    }
                    Some(_) => {}
                }
                entries.push(CapacityEntry::new(
                    parse_room_size(&row[1]).map_err(|e| e.in_row(i))?,
                    parse_i64(&row[2]).map_err(|e| e.in_row(i))?,
                    parse_i64(&row[3]).map_err(|e| e.in_row(i))?,
                ));
            }
            let hotel_id = hotel_id.ok_or_else(|| SqlError::Parse("empty VALUES".into()))?;
            Ok(Command::SetRoomCapacity { hotel_id, entries })
        }
        "reservations" => {
            let values = single_row("reservations", rows)?;
            if values.len() != 8 && values.len() != 9 {
                return Err(SqlError::WrongArity("reservations", 8, values.len()));
            }
            Ok(Command::InsertReservation(NewReservation {
                guest_id: parse_ulid(&values[0])?,
                hotel_id: parse_ulid(&values[1])?,
                event_type_id: parse_u32(&values[2])?,
                room_size: parse_room_size(&values[3])?,
                start_date: parse_date(&values[4])?,
                end_date: parse_date(&values[5])?,
                quantity: parse_i64(&values[6])?,
                people_count: parse_i64(&values[7])?,
                invoice: values.get(8).map(parse_i64).transpose()?.unwrap_or(0),
            }))
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return parse_function_call(&select.projection);
    }
    let from = match select.from.as_slice() {
        [only] if only.joins.is_empty() => only,
        _ => return Err(SqlError::Unsupported("SELECT reads exactly one view, without joins".into())),
    };
    let table = table_factor_name(&from.relation)?;
    let filter = |col: &'static str| -> Result<Ulid, SqlError> {
        find_eq_filter(select.selection.as_ref(), col)
            .ok_or(SqlError::MissingFilter(col))
            .and_then(parse_ulid)
    };

    match table.as_str() {
        "hotels" => Ok(Command::SelectHotels),
        "available_rooms" => Ok(Command::SelectAvailableRooms),
        "event_types" => Ok(Command::SelectEventTypes),
        "room_capacity" => Ok(Command::SelectRoomCapacity {
            hotel_id: filter("hotel_id")?,
        }),
        "reservation_rooms" => Ok(Command::SelectReservationRooms {
            reservation_id: filter("reservation_id")?,
        }),
        "reservations" => {
            if find_eq_filter(select.selection.as_ref(), "id").is_some() {
                Ok(Command::SelectReservation { id: filter("id")? })
            } else {
                Ok(Command::SelectGuestReservations {
                    guest_id: filter("guest_id")?,
                })
            }
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// `SELECT fn(args...)` with no FROM: the mutation procedures.
fn parse_function_call(projection: &[SelectItem]) -> Result<Command, SqlError> {
    let func = match projection {
        [SelectItem::UnnamedExpr(Expr::Function(func))] => func,
        _ => return Err(SqlError::Parse("SELECT without FROM".into())),
    };
    let name = object_name_last(&func.name).ok_or_else(|| SqlError::Parse("empty function name".into()))?;
    let args: Vec<&Expr> = match &func.args {
        FunctionArguments::List(list) => list
            .args
            .iter()
            .map(|arg| match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Ok(e),
                _ => Err(SqlError::Parse(format!("{name}: only positional arguments are supported"))),
            })
            .collect::<Result<_, _>>()?,
        FunctionArguments::None => Vec::new(),
        FunctionArguments::Subquery(_) => {
            return Err(SqlError::Unsupported("subquery arguments".into()));
        }
    };
    let arity = |expected: usize, label: &'static str| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(SqlError::WrongArity(label, expected, args.len()))
        }
    };

    match name.as_str() {
        "reserve_capacity" => {
            arity(3, "reserve_capacity")?;
            Ok(Command::ReserveCapacity {
                hotel_id: parse_ulid(args[0])?,
                size: parse_room_size(args[1])?,
                quantity: parse_i64(args[2])?,
            })
        }
        "release_capacity" => {
            arity(3, "release_capacity")?;
            Ok(Command::ReleaseCapacity {
                hotel_id: parse_ulid(args[0])?,
                size: parse_room_size(args[1])?,
                quantity: parse_i64(args[2])?,
            })
        }
        "add_extra_room" => {
            arity(2, "add_extra_room")?;
            Ok(Command::AddExtraRoom {
                reservation_id: parse_ulid(args[0])?,
                quantity: parse_i64(args[1])?,
            })
        }
        "cancel_reservation" => {
            arity(1, "cancel_reservation")?;
            Ok(Command::CancelReservation {
                reservation_id: parse_ulid(args[0])?,
            })
        }
        "complete_reservation" => {
            arity(1, "complete_reservation")?;
            Ok(Command::CompleteReservation {
                reservation_id: parse_ulid(args[0])?,
            })
        }
        _ => Err(SqlError::UnknownFunction(name)),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_rows(insert: &ast::Insert) -> Result<&[Vec<Expr>], SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) if values.rows.is_empty() => Err(SqlError::Parse("empty VALUES".into())),
        SetExpr::Values(values) => Ok(&values.rows),
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn single_row<'a>(table: &'static str, rows: &'a [Vec<Expr>]) -> Result<&'a [Expr], SqlError> {
    match rows {
        [row] => Ok(row),
        _ => Err(SqlError::Parse(format!("{table}: one row per INSERT"))),
    }
}

/// Find `col = value` anywhere in an AND-chain.
fn find_eq_filter<'a>(expr: Option<&'a Expr>, col: &str) -> Option<&'a Expr> {
    match expr? {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::And,
            right,
        } => find_eq_filter(Some(left), col).or_else(|| find_eq_filter(Some(right), col)),
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } if expr_column_name(left).as_deref() == Some(col) => Some(right),
        Expr::Nested(inner) => find_eq_filter(Some(inner), col),
        _ => None,
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(SqlError::Parse(format!("expected string, got {other}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => {
            Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID {s:?}: {e}")))
        }
        Some(other) => Err(SqlError::Parse(format!("expected ULID string, got {other}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .trim()
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer {s:?}: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        parse_i64(expr)?
            .checked_neg()
            .ok_or_else(|| SqlError::Parse("integer out of range".into()))
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64(expr)?;
    u32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of u32 range")))
}

/// Accepts a size label (`'small'`, `'m'`, `'large_hall'`) or a room-type id.
fn parse_room_size(expr: &Expr) -> Result<RoomSize, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => s.parse().map_err(|e: UnknownRoomSize| SqlError::Parse(e.to_string())),
        Some(Value::Number(n, _)) => n
            .parse()
            .ok()
            .and_then(RoomSize::from_id)
            .ok_or_else(|| SqlError::Parse(format!("unknown room type id: {n}"))),
        Some(other) => Err(SqlError::Parse(format!("expected room size, got {other}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

/// `'YYYY-MM-DD'`.
fn parse_date(expr: &Expr) -> Result<NaiveDate, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| SqlError::Parse(format!("bad date {s:?}: {e}"))),
        Some(other) => Err(SqlError::Parse(format!("expected date string, got {other}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("empty query")]
    Empty,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("{0}: expected {1} values, got {2}")]
    WrongArity(&'static str, usize, usize),
    #[error("missing filter: {0}")]
    MissingFilter(&'static str),
}

impl SqlError {
    fn in_row(self, row: usize) -> Self {
        SqlError::Parse(format!("row {row}: {self}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    const G: &str = "01BX5ZZKBKACTAV9WEVGEMMVRZ";

    #[test]
    fn parse_insert_hotel() {
        let sql = "INSERT INTO hotels VALUES ('Lakeview', '1 Shore Rd', 'WA', '98101', 'lakeview.example', '555-0100')";
        match parse_sql(sql).unwrap() {
            Command::InsertHotel(draft) => {
                assert_eq!(draft.name, "Lakeview");
                assert_eq!(draft.zip_code, "98101");
                assert_eq!(draft.phone, "555-0100");
            }
            other => panic!("expected InsertHotel, got {other:?}"),
        }
    }

    #[test]
    fn parse_insert_hotel_name_only() {
        let cmd = parse_sql("INSERT INTO hotels (name) VALUES ('Harbor')").unwrap();
        assert_eq!(cmd, Command::InsertHotel(HotelDraft::named("Harbor")));
    }

    #[test]
    fn parse_multi_row_capacity() {
        let sql = format!(
            "INSERT INTO room_capacity VALUES ('{H}', 'small', 5, 5), ('{H}', 'large_hall', 2, 1), ('{H}', 2, 0, 0)"
        );
        match parse_sql(&sql).unwrap() {
            Command::SetRoomCapacity { hotel_id, entries } => {
                assert_eq!(hotel_id.to_string(), H);
                assert_eq!(
                    entries,
                    vec![
                        CapacityEntry::new(RoomSize::Small, 5, 5),
                        CapacityEntry::new(RoomSize::Large, 2, 1),
                        CapacityEntry::new(RoomSize::Medium, 0, 0),
                    ]
                );
            }
            other => panic!("expected SetRoomCapacity, got {other:?}"),
        }
    }

    #[test]
    fn negative_capacity_parses_for_engine_to_reject() {
        let sql = format!("INSERT INTO room_capacity VALUES ('{H}', 's', -1, 0)");
        match parse_sql(&sql).unwrap() {
            Command::SetRoomCapacity { entries, .. } => assert_eq!(entries[0].total, -1),
            other => panic!("expected SetRoomCapacity, got {other:?}"),
        }
    }

    #[test]
    fn capacity_rows_must_share_a_hotel() {
        let sql = format!("INSERT INTO room_capacity VALUES ('{H}', 'small', 5, 5), ('{G}', 'small', 5, 5)");
        assert!(matches!(parse_sql(&sql), Err(SqlError::Parse(_))));
    }

    #[test]
    fn parse_insert_reservation() {
        let sql = format!(
            "INSERT INTO reservations VALUES ('{G}', '{H}', 2, 'medium', '2026-06-01', '2026-06-03', 3, 40, 1500)"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertReservation(req) => {
                assert_eq!(req.guest_id.to_string(), G);
                assert_eq!(req.event_type_id, 2);
                assert_eq!(req.room_size, RoomSize::Medium);
                assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
                assert_eq!(req.quantity, 3);
                assert_eq!(req.people_count, 40);
                assert_eq!(req.invoice, 1500);
            }
            other => panic!("expected InsertReservation, got {other:?}"),
        }
    }

    #[test]
    fn reservation_invoice_defaults_to_zero() {
        let sql = format!(
            "INSERT INTO reservations VALUES ('{G}', '{H}', 1, 'small', '2026-06-01', '2026-06-03', 1, 10)"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertReservation(req) => assert_eq!(req.invoice, 0),
            other => panic!("expected InsertReservation, got {other:?}"),
        }
    }

    #[test]
    fn bad_literals_are_rejected() {
        let bad_date = format!(
            "INSERT INTO reservations VALUES ('{G}', '{H}', 1, 'small', 'June 1', '2026-06-03', 1, 10)"
        );
        assert!(parse_sql(&bad_date).is_err());
        let bad_size = format!("SELECT reserve_capacity('{H}', 'huge', 1)");
        assert!(parse_sql(&bad_size).is_err());
        assert!(parse_sql("SELECT * FROM rooms WHERE hotel_id = 'nope'").is_err());
        assert!(parse_sql("SELECT * FROM room_capacity WHERE hotel_id = 'nope'").is_err());
    }

    #[test]
    fn parse_procedure_calls() {
        let cases = [
            (
                format!("SELECT reserve_capacity('{H}', 'small', 2)"),
                Command::ReserveCapacity {
                    hotel_id: Ulid::from_string(H).unwrap(),
                    size: RoomSize::Small,
                    quantity: 2,
                },
            ),
            (
                format!("SELECT release_capacity('{H}', 3, 1)"),
                Command::ReleaseCapacity {
                    hotel_id: Ulid::from_string(H).unwrap(),
                    size: RoomSize::Large,
                    quantity: 1,
                },
            ),
            (
                format!("SELECT add_extra_room('{G}', 2)"),
                Command::AddExtraRoom {
                    reservation_id: Ulid::from_string(G).unwrap(),
                    quantity: 2,
                },
            ),
            (
                format!("select CANCEL_RESERVATION('{G}');"),
                Command::CancelReservation {
                    reservation_id: Ulid::from_string(G).unwrap(),
                },
            ),
            (
                format!("SELECT complete_reservation('{G}')"),
                Command::CompleteReservation {
                    reservation_id: Ulid::from_string(G).unwrap(),
                },
            ),
        ];
        for (sql, expected) in cases {
            let cmd = parse_sql(&sql).unwrap();
            assert!(cmd.is_mutation());
            assert_eq!(cmd, expected, "{sql}");
        }
    }

    #[test]
    fn procedure_arity_is_checked() {
        let sql = format!("SELECT reserve_capacity('{H}', 'small')");
        assert!(matches!(parse_sql(&sql), Err(SqlError::WrongArity("reserve_capacity", 3, 2))));
        assert!(matches!(
            parse_sql("SELECT drop_everything()"),
            Err(SqlError::UnknownFunction(_))
        ));
    }

    #[test]
    fn negative_quantity_parses() {
        let sql = format!("SELECT reserve_capacity('{H}', 'small', -4)");
        match parse_sql(&sql).unwrap() {
            Command::ReserveCapacity { quantity, .. } => assert_eq!(quantity, -4),
            other => panic!("expected ReserveCapacity, got {other:?}"),
        }
    }

    #[test]
    fn parse_selects() {
        assert_eq!(parse_sql("SELECT * FROM hotels").unwrap(), Command::SelectHotels);
        assert_eq!(parse_sql("SELECT * FROM available_rooms").unwrap(), Command::SelectAvailableRooms);
        assert_eq!(parse_sql("SELECT * FROM event_types").unwrap(), Command::SelectEventTypes);

        let h = Ulid::from_string(H).unwrap();
        let g = Ulid::from_string(G).unwrap();
        assert_eq!(
            parse_sql(&format!("SELECT * FROM room_capacity WHERE hotel_id = '{H}'")).unwrap(),
            Command::SelectRoomCapacity { hotel_id: h }
        );
        assert_eq!(
            parse_sql(&format!("SELECT * FROM reservation_rooms WHERE reservation_id = '{G}'")).unwrap(),
            Command::SelectReservationRooms { reservation_id: g }
        );
        assert_eq!(
            parse_sql(&format!("SELECT * FROM reservations WHERE guest_id = '{G}'")).unwrap(),
            Command::SelectGuestReservations { guest_id: g }
        );
        assert_eq!(
            parse_sql(&format!("SELECT * FROM reservations WHERE id = '{G}'")).unwrap(),
            Command::SelectReservation { id: g }
        );
        assert!(!Command::SelectHotels.is_mutation());
    }

    #[test]
    fn filter_found_inside_and_chain() {
        let sql = format!("SELECT * FROM room_capacity WHERE size = 'small' AND hotel_id = '{H}'");
        assert_eq!(
            parse_sql(&sql).unwrap(),
            Command::SelectRoomCapacity { hotel_id: Ulid::from_string(H).unwrap() }
        );
    }

    #[test]
    fn missing_filter_reported() {
        assert!(matches!(
            parse_sql("SELECT * FROM room_capacity"),
            Err(SqlError::MissingFilter("hotel_id"))
        ));
        assert!(matches!(
            parse_sql("SELECT * FROM reservations"),
            Err(SqlError::MissingFilter("guest_id"))
        ));
    }

    #[test]
    fn rejects_other_statements() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
        assert!(matches!(parse_sql("DELETE FROM hotels"), Err(SqlError::Unsupported(_))));
        assert!(matches!(parse_sql("INSERT INTO guests VALUES (1)"), Err(SqlError::UnknownTable(_))));
        assert!(matches!(
            parse_sql("SELECT * FROM hotels; SELECT * FROM hotels"),
            Err(SqlError::Unsupported(_))
        ));
    }

    #[test]
    fn rejects_multiple_views_and_joins() {
        assert!(matches!(
            parse_sql("SELECT * FROM hotels, reservations"),
            Err(SqlError::Unsupported(_))
        ));
        assert!(matches!(
            parse_sql("SELECT * FROM hotels JOIN room_capacity ON hotels.id = room_capacity.hotel_id"),
            Err(SqlError::Unsupported(_))
        ));
    }
}
