//! Parse-and-validate boundary for client forms.
//!
//! Clients may send numeric fields either as JSON numbers or as text typed
//! into a form. Everything is converted to strict numeric types here, once,
//! before any value reaches the nutrition pipeline or the database.

use axum::http::StatusCode;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use crate::nutrition::{
    round_to, ActivityLevel, Gender, Goal, MealSlot, NutrientProfile, Nutrients, UserProfile,
};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

lazy_static! {
    static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref LOWER_RE: Regex = Regex::new(r"[a-z]").unwrap();
    static ref UPPER_RE: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for (StatusCode, String) {
    fn from(e: ValidationError) -> Self {
        (StatusCode::BAD_REQUEST, e.message)
    }
}

/// A numeric form field sent either as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormNumber {
    Number(f64),
    Text(String),
}

impl From<f64> for FormNumber {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for FormNumber {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl FormNumber {
    fn real(&self, field: &'static str, label: &str) -> Result<f64, ValidationError> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::new(field, format!("{label} must be a number")))?,
        };
        if !value.is_finite() {
            return Err(ValidationError::new(field, format!("{label} must be a number")));
        }
        Ok(value)
    }

    fn whole(&self, field: &'static str, label: &str) -> Result<u32, ValidationError> {
        let not_whole = || ValidationError::new(field, format!("{label} must be a whole number"));
        match self {
            Self::Number(v) if v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX) => {
                Ok(*v as u32)
            }
            Self::Number(_) => Err(not_whole()),
            Self::Text(s) => s.trim().parse::<u32>().map_err(|_| not_whole()),
        }
    }
}

fn bounded(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
    too_low: &str,
    too_high: &str,
) -> Result<f64, ValidationError> {
    if value < min {
        Err(ValidationError::new(field, too_low))
    } else if value > max {
        Err(ValidationError::new(field, too_high))
    } else {
        Ok(value)
    }
}

fn text_len(
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.trim();
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::new(
            field,
            format!("{label} must be at least {min} characters"),
        ));
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("{label} must be less than {max} characters"),
        ));
    }
    Ok(value.to_string())
}

pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    text_len("username", "Username", username, 3, 20)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < 3 {
        return Err(ValidationError::new("password", "Password must be at least 3 characters"));
    }
    if len > 25 {
        return Err(ValidationError::new("password", "Password must be less than 25 characters"));
    }
    if !LOWER_RE.is_match(password) {
        return Err(ValidationError::new(
            "password",
            "Password must contain at least one lowercase letter",
        ));
    }
    if !UPPER_RE.is_match(password) {
        return Err(ValidationError::new(
            "password",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !DIGIT_RE.is_match(password) {
        return Err(ValidationError::new("password", "Password must contain at least one number"));
    }
    Ok(())
}

/// EAN/UPC style: digits only, trimmed.
pub fn validate_barcode(raw: &str) -> Result<String, ValidationError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ValidationError::new("barcode", "Barcode is required"));
    }
    if code.len() > 32 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("barcode", "Barcode must be up to 32 digits"));
    }
    Ok(code.to_string())
}

/// Parses `YYYY-MM-DD`, defaulting to today (UTC) when absent.
pub fn parse_date(raw: Option<&str>) -> Result<Date, ValidationError> {
    let Some(raw) = raw else {
        return Ok(OffsetDateTime::now_utc().date());
    };
    let invalid = || ValidationError::new("date", "Date must be in YYYY-MM-DD format");
    if !DATE_RE.is_match(raw) {
        return Err(invalid());
    }
    Date::parse(raw, DATE_FORMAT).map_err(|_| invalid())
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

fn meal_slot(raw: &str) -> Result<MealSlot, ValidationError> {
    MealSlot::parse(raw).ok_or_else(|| {
        ValidationError::new("meal_type", "Meal type must be breakfast, lunch, dinner or snack")
    })
}

fn quantity(raw: &FormNumber) -> Result<f64, ValidationError> {
    let q = raw.real("quantity", "Quantity")?;
    bounded(
        "quantity",
        q,
        1.0,
        1000.0,
        "Quantity must be at least 1 gram",
        "Quantity must be less than 1000 grams",
    )
}

fn non_negative(
    field: &'static str,
    label: &str,
    raw: &FormNumber,
    min: f64,
    max: f64,
    unit: &str,
) -> Result<f64, ValidationError> {
    let v = raw.real(field, label)?;
    let too_low = if min > 0.0 {
        format!("{label} must be at least {min}")
    } else {
        format!("{label} must be a positive number")
    };
    bounded(field, v, min, max, &too_low, &format!("{label} must be less than {max}{unit}"))
}

/// Per-100g ranges. Logged amounts may be up to `quantity / 100` times these.
const CALORIES_PER_100G: (f64, f64) = (1.0, 2000.0);
const MACRO_GRAMS_PER_100G: f64 = 200.0;

/// The six nutrient fields shared by meal and product forms.
#[derive(Debug, Clone, Deserialize)]
pub struct NutrientFields {
    pub calories: FormNumber,
    pub fat: FormNumber,
    pub carbohydrates: FormNumber,
    pub sugar: FormNumber,
    pub protein: FormNumber,
    pub fiber: FormNumber,
}

impl NutrientFields {
    /// Values per 100 g of a food.
    pub fn validate(&self) -> Result<Nutrients, ValidationError> {
        self.within(CALORIES_PER_100G.0, CALORIES_PER_100G.1, MACRO_GRAMS_PER_100G)
    }

    /// Absolute amounts for a `quantity_g` portion. The upper bounds are the
    /// per-100g ones scaled the same way a new meal is, so stored meals always
    /// pass again unchanged.
    pub fn validate_absolute(&self, quantity_g: f64) -> Result<Nutrients, ValidationError> {
        let ratio = quantity_g / 100.0;
        self.within(
            0.0,
            round_to(CALORIES_PER_100G.1 * ratio, 2),
            round_to(MACRO_GRAMS_PER_100G * ratio, 2),
        )
    }

    fn within(&self, cal_min: f64, cal_max: f64, macro_max: f64) -> Result<Nutrients, ValidationError> {
        let grams = |field: &'static str, label: &str, raw: &FormNumber| {
            non_negative(field, label, raw, 0.0, macro_max, " grams")
        };
        Ok(Nutrients {
            calories: non_negative("calories", "Calories", &self.calories, cal_min, cal_max, "")?,
            fat: grams("fat", "Fat", &self.fat)?,
            carbohydrates: grams("carbohydrates", "Carbohydrates", &self.carbohydrates)?,
            sugar: grams("sugar", "Sugar", &self.sugar)?,
            protein: grams("protein", "Protein", &self.protein)?,
            fiber: grams("fiber", "Fiber", &self.fiber)?,
        })
    }
}

/// Registration and full profile replacement share the same form.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: String,
    pub age: FormNumber,
    pub height: FormNumber,
    pub weight: FormNumber,
    pub activity_level: String,
    pub goal: String,
}

#[derive(Debug, Clone)]
pub struct ValidProfile {
    pub username: String,
    pub password: String,
    pub profile: UserProfile,
}

impl ProfileForm {
    pub fn validate(self) -> Result<ValidProfile, ValidationError> {
        let username = validate_username(&self.username)?;
        validate_password(&self.password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::new("confirm_password", "Passwords do not match"));
        }
        let gender = Gender::parse(&self.gender)
            .ok_or_else(|| ValidationError::new("gender", "Gender must be male or female"))?;
        let age = self.age.whole("age", "Age")?;
        bounded(
            "age",
            f64::from(age),
            14.0,
            100.0,
            "Age must be at least 14",
            "Age must be less than 100",
        )?;
        let height_cm = bounded(
            "height",
            self.height.real("height", "Height")?,
            100.0,
            230.0,
            "Height must be at least 100 cm",
            "Height must be less than 230 cm",
        )?;
        let weight_kg = bounded(
            "weight",
            self.weight.real("weight", "Weight")?,
            40.0,
            250.0,
            "Weight must be at least 40 kg",
            "Weight must be less than 250 kg",
        )?;
        let activity_level = ActivityLevel::parse(&self.activity_level).ok_or_else(|| {
            ValidationError::new(
                "activity_level",
                "Activity level must be sedentary, lightly, moderately or very",
            )
        })?;
        let goal = Goal::parse(&self.goal).ok_or_else(|| {
            ValidationError::new("goal", "Goal must be weight loss, weight gain or maintenance")
        })?;

        Ok(ValidProfile {
            username,
            password: self.password,
            profile: UserProfile {
                gender,
                age,
                height_cm,
                weight_kg,
                activity_level,
                goal,
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(self) -> Result<Self, ValidationError> {
        let username = validate_username(&self.username)?;
        validate_password(&self.password)?;
        Ok(Self {
            username,
            password: self.password,
        })
    }
}

/// A meal entry. On create the nutrient fields are per 100 g; on edit they
/// are the absolute amounts that replace the stored ones.
#[derive(Debug, Clone, Deserialize)]
pub struct MealForm {
    pub food_name: String,
    pub meal_type: String,
    pub quantity: FormNumber,
    #[serde(flatten)]
    pub nutrients: NutrientFields,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidMeal {
    pub food_name: String,
    pub meal_type: MealSlot,
    pub quantity_g: f64,
    pub nutrients: Nutrients,
    pub date: Date,
}

impl MealForm {
    /// New meal, nutrients per 100 g.
    pub fn validate(&self) -> Result<ValidMeal, ValidationError> {
        self.validated(false)
    }

    /// Edited meal, nutrients are absolute amounts for the given quantity.
    pub fn validate_edit(&self) -> Result<ValidMeal, ValidationError> {
        self.validated(true)
    }

    fn validated(&self, absolute: bool) -> Result<ValidMeal, ValidationError> {
        let food_name = text_len("food_name", "Food name", &self.food_name, 2, 50)?;
        let meal_type = meal_slot(&self.meal_type)?;
        let quantity_g = quantity(&self.quantity)?;
        let nutrients = if absolute {
            self.nutrients.validate_absolute(quantity_g)?
        } else {
            self.nutrients.validate()?
        };
        Ok(ValidMeal {
            food_name,
            meal_type,
            quantity_g,
            nutrients,
            date: parse_date(self.date.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductForm {
    pub product_name: String,
    pub barcode: String,
    #[serde(flatten)]
    pub nutrients: NutrientFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidProduct {
    pub product_name: String,
    pub barcode: String,
    pub per_100g: NutrientProfile,
}

impl ProductForm {
    pub fn validate(&self) -> Result<ValidProduct, ValidationError> {
        let barcode = validate_barcode(&self.barcode)?;
        Ok(ValidProduct {
            product_name: text_len("product_name", "Product name", &self.product_name, 2, 50)?,
            barcode,
            per_100g: self.nutrients.validate()?,
        })
    }
}

/// Logs a portion of a known product, referenced by catalogue id or barcode.
#[derive(Debug, Clone, Deserialize)]
pub struct PortionForm {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub quantity: FormNumber,
    pub meal_type: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    Id(Uuid),
    Barcode(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidPortion {
    pub product: ProductRef,
    pub quantity_g: f64,
    pub meal_type: MealSlot,
    pub date: Date,
}

impl PortionForm {
    pub fn validate(&self) -> Result<ValidPortion, ValidationError> {
        let barcode = self
            .barcode
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty());
        let product = match (self.product_id, barcode) {
            (Some(id), None) => ProductRef::Id(id),
            (None, Some(code)) => ProductRef::Barcode(validate_barcode(code)?),
            _ => {
                return Err(ValidationError::new(
                    "product",
                    "Exactly one of product_id or barcode is required",
                ))
            }
        };
        Ok(ValidPortion {
            product,
            quantity_g: quantity(&self.quantity)?,
            meal_type: meal_slot(&self.meal_type)?,
            date: parse_date(self.date.as_deref())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn profile_form() -> ProfileForm {
        ProfileForm {
            username: "alice".into(),
            password: "Secr3tPw".into(),
            confirm_password: "Secr3tPw".into(),
            gender: "female".into(),
            age: "34".into(),
            height: 168.0.into(),
            weight: "61.5".into(),
            activity_level: "lightly".into(),
            goal: "maintenance".into(),
        }
    }

    fn nutrient_fields() -> NutrientFields {
        NutrientFields {
            calories: "250".into(),
            fat: 10.0.into(),
            carbohydrates: "30.5".into(),
            sugar: "0".into(),
            protein: 12.0.into(),
            fiber: " 3 ".into(),
        }
    }

    #[test]
    fn form_numbers_accept_text_and_numbers() {
        let json = r#"{"calories":"250","fat":10,"carbohydrates":"30.5","sugar":0,"protein":"12","fiber":3}"#;
        let fields: NutrientFields = serde_json::from_str(json).unwrap();
        let n = fields.validate().expect("valid nutrients");
        assert_eq!(n.calories, 250.0);
        assert_eq!(n.carbohydrates, 30.5);
        assert_eq!(n.protein, 12.0);
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        let mut fields = nutrient_fields();
        fields.fat = "lots".into();
        let err = fields.validate().unwrap_err();
        assert_eq!(err.field, "fat");
        assert_eq!(err.message, "Fat must be a number");

        fields.fat = "NaN".into();
        assert_eq!(fields.validate().unwrap_err().field, "fat");
    }

    #[test]
    fn nutrient_ranges_are_inclusive() {
        let mut fields = nutrient_fields();
        fields.calories = 2000.0.into();
        fields.sugar = 200.0.into();
        assert!(fields.validate().is_ok());

        fields.calories = 0.5.into();
        assert_eq!(fields.validate().unwrap_err().message, "Calories must be at least 1");

        fields.calories = 100.0.into();
        fields.protein = (-1.0).into();
        assert_eq!(fields.validate().unwrap_err().message, "Protein must be a positive number");
    }

    #[test]
    fn profile_form_produces_user_profile() {
        let valid = profile_form().validate().expect("valid profile");
        assert_eq!(valid.username, "alice");
        assert_eq!(valid.profile.gender, Gender::Female);
        assert_eq!(valid.profile.age, 34);
        assert_eq!(valid.profile.height_cm, 168.0);
        assert_eq!(valid.profile.weight_kg, 61.5);
        assert_eq!(valid.profile.activity_level, ActivityLevel::Lightly);
        assert_eq!(valid.profile.goal, Goal::Maintenance);
    }

    #[test]
    fn profile_form_rejects_bad_fields() {
        let mut form = profile_form();
        form.confirm_password = "Other1pw".into();
        assert_eq!(form.validate().unwrap_err().field, "confirm_password");

        let mut form = profile_form();
        form.age = "13".into();
        assert_eq!(form.validate().unwrap_err().message, "Age must be at least 14");

        let mut form = profile_form();
        form.age = 30.5.into();
        assert_eq!(form.validate().unwrap_err().field, "age");

        let mut form = profile_form();
        form.activity_level = "extreme".into();
        assert_eq!(form.validate().unwrap_err().field, "activity_level");

        let mut form = profile_form();
        form.goal = "bulk".into();
        assert_eq!(form.validate().unwrap_err().field, "goal");

        let mut form = profile_form();
        form.weight = "251".into();
        assert_eq!(form.validate().unwrap_err().message, "Weight must be less than 250 kg");
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Abc1").is_ok());
        assert!(validate_password("Ab").is_err());
        assert!(validate_password("abc123").is_err());
        assert!(validate_password("ABC123").is_err());
        assert!(validate_password("Abcdef").is_err());
        assert!(validate_password(&format!("Aa1{}", "x".repeat(23))).is_err());
    }

    #[test]
    fn username_is_trimmed_and_bounded() {
        assert_eq!(validate_username("  bob ").unwrap(), "bob");
        assert!(validate_username("bo").is_err());
        assert!(validate_username(&"b".repeat(21)).is_err());
    }

    #[test]
    fn dates_must_be_iso_calendar_days() {
        assert_eq!(parse_date(Some("2024-02-29")).unwrap(), date!(2024 - 02 - 29));
        assert!(parse_date(Some("2023-02-29")).is_err());
        assert!(parse_date(Some("29/02/2024")).is_err());
        assert!(parse_date(Some("2024-2-9")).is_err());
        assert_eq!(parse_date(None).unwrap(), OffsetDateTime::now_utc().date());
        assert_eq!(format_date(date!(2024 - 03 - 07)), "2024-03-07");
    }

    #[test]
    fn meal_form_from_json() {
        let json = r#"{
            "food_name": "Oatmeal",
            "meal_type": "breakfast",
            "quantity": "80",
            "calories": "389", "fat": "6.9", "carbohydrates": "66.3",
            "sugar": "0.9", "protein": "16.9", "fiber": "10.6",
            "date": "2024-03-01"
        }"#;
        let form: MealForm = serde_json::from_str(json).unwrap();
        let meal = form.validate().expect("valid meal");
        assert_eq!(meal.meal_type, MealSlot::Breakfast);
        assert_eq!(meal.quantity_g, 80.0);
        assert_eq!(meal.nutrients.calories, 389.0);
        assert_eq!(meal.date, date!(2024 - 03 - 01));
    }

    #[test]
    fn meal_form_rejects_zero_quantity_and_unknown_slot() {
        let mut form = MealForm {
            food_name: "Apple".into(),
            meal_type: "brunch".into(),
            quantity: "100".into(),
            nutrients: nutrient_fields(),
            date: None,
        };
        assert_eq!(form.validate().unwrap_err().field, "meal_type");
        form.meal_type = "snack".into();
        form.quantity = "0".into();
        assert_eq!(form.validate().unwrap_err().message, "Quantity must be at least 1 gram");
        form.food_name = "A".into();
        assert_eq!(form.validate().unwrap_err().field, "food_name");
    }

    #[test]
    fn edited_meals_are_bounded_by_their_quantity() {
        let mut form = MealForm {
            food_name: "Trail mix".into(),
            meal_type: "snack".into(),
            quantity: 1000.0.into(),
            nutrients: NutrientFields {
                calories: 5880.0.into(),
                fat: 500.0.into(),
                carbohydrates: "0".into(),
                sugar: 0.0.into(),
                protein: 0.0.into(),
                fiber: 0.0.into(),
            },
            date: None,
        };
        let meal = form.validate_edit().expect("absolute amounts within scaled bounds");
        assert_eq!(meal.nutrients.calories, 5880.0);
        assert_eq!(meal.nutrients.fat, 500.0);
        assert_eq!(form.validate().unwrap_err().field, "calories");

        form.nutrients.calories = 0.0.into();
        assert!(form.validate_edit().is_ok());

        form.nutrients.fat = 2000.5.into();
        assert_eq!(
            form.validate_edit().unwrap_err().message,
            "Fat must be less than 2000 grams"
        );

        form.nutrients.fat = (-0.1).into();
        assert_eq!(form.validate_edit().unwrap_err().message, "Fat must be a positive number");

        form.nutrients.fat = 10.0.into();
        form.quantity = 50.0.into();
        form.nutrients.calories = 1000.01.into();
        assert_eq!(form.validate_edit().unwrap_err().message, "Calories must be less than 1000");
    }

    #[test]
    fn product_form_requires_barcode() {
        let mut form = ProductForm {
            product_name: "Granola".into(),
            barcode: "  ".into(),
            nutrients: nutrient_fields(),
        };
        assert_eq!(form.validate().unwrap_err().field, "barcode");
        form.barcode = " 4006381333931 ".into();
        let product = form.validate().unwrap();
        assert_eq!(product.barcode, "4006381333931");
        assert_eq!(product.per_100g.calories, 250.0);

        form.barcode = "4006%3F1".into();
        assert_eq!(form.validate().unwrap_err().message, "Barcode must be up to 32 digits");
    }

    #[test]
    fn barcodes_are_digits_only() {
        assert_eq!(validate_barcode(" 737628064502\n").unwrap(), "737628064502");
        assert!(validate_barcode("12?34").is_err());
        assert!(validate_barcode("12#34").is_err());
        assert!(validate_barcode("abc").is_err());
        assert!(validate_barcode(&"1".repeat(33)).is_err());
    }

    #[test]
    fn portion_form_needs_exactly_one_reference() {
        let mut form = PortionForm {
            product_id: None,
            barcode: None,
            quantity: 50.0.into(),
            meal_type: "dinner".into(),
            date: Some("2024-01-10".into()),
        };
        assert_eq!(form.validate().unwrap_err().field, "product");

        form.barcode = Some("737628064502".into());
        let portion = form.validate().unwrap();
        assert_eq!(portion.product, ProductRef::Barcode("737628064502".into()));

        form.barcode = Some("7376/../1".into());
        assert_eq!(form.validate().unwrap_err().field, "barcode");

        form.barcode = Some("737628064502".into());
        form.product_id = Some(Uuid::new_v4());
        assert_eq!(form.validate().unwrap_err().field, "product");
    }

    #[test]
    fn validation_error_maps_to_bad_request() {
        let (status, msg): (StatusCode, String) =
            ValidationError::new("x", "X is wrong").into();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "X is wrong");
    }
}
