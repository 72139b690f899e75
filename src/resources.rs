//! The catalogue of list/edit pages and the form handling they share.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::utils::{display_value, format_money};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    TextArea,
    Number,
    Money,
    Date,
    Month,
    Select(&'static [&'static str]),
    Checkbox,
    Password,
}

impl FieldKind {
    fn input_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::TextArea => "textarea",
            FieldKind::Number | FieldKind::Money => "number",
            FieldKind::Date => "date",
            FieldKind::Month => "month",
            FieldKind::Select(_) => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Password => "password",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Shown as a table column on the list page.
    pub listed: bool,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    required: bool,
    listed: bool,
) -> Field {
    Field {
        name,
        label,
        kind,
        required,
        listed,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Filter {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn filter(name: &'static str, label: &'static str, kind: FieldKind) -> Filter {
    Filter { name, label, kind }
}

const TRANSACTION_TYPES: &[&str] = &["income", "expense", "asset"];
const PAYMENT_METHODS: &[&str] = &["cash", "bank", "mobile"];
const PAYMENT_STATUS: &[&str] = &["pending", "paid"];
const GRAVE_STATUS: &[&str] = &["reserved", "occupied", "cancelled"];

use FieldKind::*;

const CATEGORY_FIELDS: &[Field] = &[
    field("name", "Name", Text, true, true),
    field("type", "Type", Select(TRANSACTION_TYPES), true, true),
    field("description", "Description", TextArea, false, true),
];

const TRANSACTION_FIELDS: &[Field] = &[
    field("date", "Date", Date, true, true),
    field("type", "Type", Select(TRANSACTION_TYPES), true, true),
    field("category_id", "Category ID", Number, true, false),
    field("amount", "Amount", Money, true, true),
    field("donor_id", "Donor ID", Number, false, false),
    field("payment_method", "Payment method", Select(PAYMENT_METHODS), false, true),
    field("description", "Description", TextArea, false, true),
];

const STUDENT_FIELDS: &[Field] = &[
    field("name", "Name", Text, true, true),
    field("guardian_name", "Guardian", Text, false, true),
    field("phone", "Phone", Text, false, true),
    field("class_name", "Class", Text, false, true),
    field("admission_date", "Admitted", Date, false, false),
    field("monthly_fee", "Monthly fee", Money, false, true),
];

const STAFF_FIELDS: &[Field] = &[
    field("name", "Name", Text, true, true),
    field("designation", "Designation", Text, false, true),
    field("phone", "Phone", Text, false, true),
    field("salary", "Salary", Money, false, true),
    field("join_date", "Joined", Date, false, false),
];

const DONOR_FIELDS: &[Field] = &[
    field("name", "Name", Text, true, true),
    field("phone", "Phone", Text, false, true),
    field("address", "Address", Text, false, true),
    field("notes", "Notes", TextArea, false, false),
];

const DUE_PAYMENT_FIELDS: &[Field] = &[
    field("title", "Title", Text, true, true),
    field("amount", "Amount", Money, true, true),
    field("due_date", "Due date", Date, true, true),
    field("category_id", "Category ID", Number, false, false),
    field("status", "Status", Select(PAYMENT_STATUS), false, true),
    field("notes", "Notes", TextArea, false, false),
];

const MONTHLY_FEE_FIELDS: &[Field] = &[
    field("student_id", "Student ID", Number, true, true),
    field("month", "Month", Month, true, true),
    field("amount", "Amount", Money, true, true),
    field("status", "Status", Select(PAYMENT_STATUS), false, true),
    field("paid_on", "Paid on", Date, false, true),
];

const STAFF_SALARY_FIELDS: &[Field] = &[
    field("staff_id", "Staff ID", Number, true, true),
    field("month", "Month", Month, true, true),
    field("amount", "Amount", Money, true, true),
    field("paid_on", "Paid on", Date, false, true),
];

const GRAVE_FIELDS: &[Field] = &[
    field("reserved_for", "Reserved for", Text, true, true),
    field("plot_number", "Plot", Text, true, true),
    field("reserved_by", "Reserved by", Text, false, true),
    field("phone", "Phone", Text, false, false),
    field("reservation_date", "Reserved on", Date, false, true),
    field("amount", "Amount", Money, false, true),
    field("status", "Status", Select(GRAVE_STATUS), false, true),
];

const CHECKLIST_TASK_FIELDS: &[Field] = &[
    field("title", "Title", Text, true, true),
    field("description", "Description", TextArea, false, true),
];

const USER_FIELDS: &[Field] = &[
    field("name", "Name", Text, true, true),
    field("email", "Email", Text, true, true),
    field("password", "Password", Password, true, false),
    field("is_admin", "Admin", Checkbox, false, true),
];

const CATEGORY_FILTERS: &[Filter] = &[filter("type", "Type", Select(TRANSACTION_TYPES))];

const TRANSACTION_FILTERS: &[Filter] = &[
    filter("type", "Type", Select(TRANSACTION_TYPES)),
    filter("category_id", "Category ID", Number),
    filter("from", "From", Date),
    filter("to", "To", Date),
];

const STUDENT_FILTERS: &[Filter] = &[
    filter("class_name", "Class", Text),
    filter("search", "Search", Text),
];

const SEARCH_FILTERS: &[Filter] = &[filter("search", "Search", Text)];

const DUE_PAYMENT_FILTERS: &[Filter] = &[
    filter("status", "Status", Select(PAYMENT_STATUS)),
    filter("month", "Month", Month),
];

const MONTHLY_FEE_FILTERS: &[Filter] = &[
    filter("month", "Month", Month),
    filter("status", "Status", Select(PAYMENT_STATUS)),
];

const MONTH_FILTERS: &[Filter] = &[filter("month", "Month", Month)];

const GRAVE_FILTERS: &[Filter] = &[
    filter("status", "Status", Select(GRAVE_STATUS)),
    filter("search", "Search", Text),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resource {
    Categories,
    Transactions,
    Students,
    Staff,
    Donors,
    DuePayments,
    MonthlyFees,
    StaffSalaries,
    GraveReservations,
    ChecklistTasks,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Categories,
        Resource::Transactions,
        Resource::Students,
        Resource::Staff,
        Resource::Donors,
        Resource::DuePayments,
        Resource::MonthlyFees,
        Resource::StaffSalaries,
        Resource::GraveReservations,
        Resource::ChecklistTasks,
        Resource::Users,
    ];

    pub fn from_slug(slug: &str) -> Option<Resource> {
        Self::ALL.into_iter().find(|r| r.slug() == slug)
    }

    /// URL segment of the dashboard page.
    pub fn slug(&self) -> &'static str {
        match self {
            Resource::Categories => "categories",
            Resource::Transactions => "transactions",
            Resource::Students => "students",
            Resource::Staff => "staff",
            Resource::Donors => "donors",
            Resource::DuePayments => "due-payments",
            Resource::MonthlyFees => "monthly-fees",
            Resource::StaffSalaries => "staff-salaries",
            Resource::GraveReservations => "grave-reservations",
            Resource::ChecklistTasks => "checklist-tasks",
            Resource::Users => "users",
        }
    }

    /// Collection path on the backend.
    pub fn api_path(&self) -> &'static str {
        // The backend mirrors the dashboard's URL layout.
        self.slug()
    }

    pub fn title(&self) -> &'static str {
        match self {
            Resource::Categories => "Categories",
            Resource::Transactions => "Transactions",
            Resource::Students => "Students",
            Resource::Staff => "Staff",
            Resource::Donors => "Donors",
            Resource::DuePayments => "Due Payments",
            Resource::MonthlyFees => "Monthly Fees",
            Resource::StaffSalaries => "Staff Salaries",
            Resource::GraveReservations => "Grave Reservations",
            Resource::ChecklistTasks => "Checklist Tasks",
            Resource::Users => "Users",
        }
    }

    pub fn admin_only(&self) -> bool {
        matches!(self, Resource::Users)
    }

    pub fn fields(&self) -> &'static [Field] {
        match self {
            Resource::Categories => CATEGORY_FIELDS,
            Resource::Transactions => TRANSACTION_FIELDS,
            Resource::Students => STUDENT_FIELDS,
            Resource::Staff => STAFF_FIELDS,
            Resource::Donors => DONOR_FIELDS,
            Resource::DuePayments => DUE_PAYMENT_FIELDS,
            Resource::MonthlyFees => MONTHLY_FEE_FIELDS,
            Resource::StaffSalaries => STAFF_SALARY_FIELDS,
            Resource::GraveReservations => GRAVE_FIELDS,
            Resource::ChecklistTasks => CHECKLIST_TASK_FIELDS,
            Resource::Users => USER_FIELDS,
        }
    }

    pub fn filters(&self) -> &'static [Filter] {
        match self {
            Resource::Categories => CATEGORY_FILTERS,
            Resource::Transactions => TRANSACTION_FILTERS,
            Resource::Students => STUDENT_FILTERS,
            Resource::Staff | Resource::Donors => SEARCH_FILTERS,
            Resource::DuePayments => DUE_PAYMENT_FILTERS,
            Resource::MonthlyFees => MONTHLY_FEE_FILTERS,
            Resource::StaffSalaries => MONTH_FILTERS,
            Resource::GraveReservations => GRAVE_FILTERS,
            Resource::ChecklistTasks | Resource::Users => &[],
        }
    }

    /// Query parameters for the list request: declared filters with a
    /// non-blank value, in declaration order.
    pub fn list_query(&self, params: &HashMap<String, String>) -> Vec<(String, String)> {
        self.filters()
            .iter()
            .filter_map(|f| {
                let value = params.get(f.name)?.trim();
                (!value.is_empty()).then(|| (f.name.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Validate submitted form values into a JSON body.
    ///
    /// Blank optional fields become `null`; a blank password on edit is left
    /// out so the stored one is kept.
    pub fn validate(
        &self,
        form: &HashMap<String, String>,
        editing: bool,
    ) -> Result<Value, HashMap<&'static str, String>> {
        let mut body = Map::new();
        let mut errors = HashMap::new();

        for f in self.fields() {
            let raw = form.get(f.name).map(|v| v.trim()).unwrap_or("");

            if f.kind == Checkbox {
                body.insert(f.name.to_string(), Value::Bool(!raw.is_empty()));
                continue;
            }
            if raw.is_empty() {
                if f.kind == Password && editing {
                    continue;
                }
                if f.required {
                    errors.insert(f.name, format!("{} is required", f.label));
                } else {
                    body.insert(f.name.to_string(), Value::Null);
                }
                continue;
            }

            match parse_value(f.kind, raw) {
                Ok(value) => {
                    body.insert(f.name.to_string(), value);
                }
                Err(message) => {
                    errors.insert(f.name, format!("{} {}", f.label, message));
                }
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(body))
        } else {
            Err(errors)
        }
    }
}

fn parse_value(kind: FieldKind, raw: &str) -> Result<Value, &'static str> {
    match kind {
        Number | Money => {
            let n: f64 = raw.parse().map_err(|_| "must be a number")?;
            if !n.is_finite() {
                return Err("must be a number");
            }
            // keep whole numbers integral so ids stay ids
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Ok(Value::Number(serde_json::Number::from(n as i64)))
            } else {
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or("must be a number")
            }
        }
        Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|_| Value::String(raw.to_string()))
            .map_err(|_| "must be a date (YYYY-MM-DD)"),
        Month => NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d")
            .map(|_| Value::String(raw.to_string()))
            .map_err(|_| "must be a month (YYYY-MM)"),
        Select(options) => {
            if options.contains(&raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err("has an unknown value")
            }
        }
        Text | TextArea | Password | Checkbox => Ok(Value::String(raw.to_string())),
    }
}

/// One input of a rendered form or filter bar.
#[derive(Serialize, Debug, Clone)]
pub struct InputView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub required: bool,
    pub options: Vec<&'static str>,
    pub value: String,
    pub checked: bool,
    pub error: Option<String>,
}

fn input_view(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    required: bool,
    value: String,
) -> InputView {
    let options = match kind {
        Select(options) => options.to_vec(),
        _ => Vec::new(),
    };
    let checked = kind == Checkbox && matches!(value.as_str(), "true" | "on" | "1");
    InputView {
        name,
        label,
        input_type: kind.input_type(),
        required,
        options,
        value,
        checked,
        error: None,
    }
}

impl Resource {
    /// Form inputs pre-filled from a record or from the submitted values.
    pub fn form_inputs(
        &self,
        values: &HashMap<String, String>,
        errors: &HashMap<&'static str, String>,
        editing: bool,
    ) -> Vec<InputView> {
        self.fields()
            .iter()
            .map(|f| {
                let value = match f.kind {
                    // never echo passwords back
                    Password => String::new(),
                    _ => values.get(f.name).cloned().unwrap_or_default(),
                };
                let required = f.required && !(f.kind == Password && editing);
                let mut input = input_view(f.name, f.label, f.kind, required, value);
                input.error = errors.get(f.name).cloned();
                input
            })
            .collect()
    }

    pub fn filter_inputs(&self, params: &HashMap<String, String>) -> Vec<InputView> {
        self.filters()
            .iter()
            .map(|f| {
                let value = params.get(f.name).cloned().unwrap_or_default();
                input_view(f.name, f.label, f.kind, false, value)
            })
            .collect()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.fields()
            .iter()
            .filter(|f| f.listed)
            .map(|f| f.label)
            .collect()
    }

    /// Format a backend record into the table cells of the list page.
    pub fn table_row(&self, record: &Value, currency: &str) -> TableRow {
        let cells = self
            .fields()
            .iter()
            .filter(|f| f.listed)
            .map(|f| {
                let value = record.get(f.name).unwrap_or(&Value::Null);
                match (f.kind, value) {
                    (Money, Value::Null) => String::new(),
                    (Money, v) => format_money(v, currency),
                    (Checkbox, Value::Bool(b)) => (if *b { "Yes" } else { "No" }).to_string(),
                    (_, v) => display_value(v),
                }
            })
            .collect();
        TableRow {
            id: record.get("id").map(display_value).unwrap_or_default(),
            cells,
            status: record
                .get("status")
                .map(display_value)
                .unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub cells: Vec<String>,
    pub status: String,
}

/// Flatten a backend record into form values.
pub fn record_values(record: &Value) -> HashMap<String, String> {
    match record {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), display_value(v)))
            .collect(),
        _ => HashMap::new(),
    }
}
