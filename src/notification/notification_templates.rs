//! Bilingual notification texts.
//!
//! Each function is a fixed substitution: it interpolates references, names,
//! dates and amounts into an English and an Arabic title/message pair.

use chrono::NaiveDate;

use super::notification_models::NotificationType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedText {
    pub en: String,
    pub ar: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, ar: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            ar: ar.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub title: LocalizedText,
    pub message: LocalizedText,
}

impl Template {
    fn new(title: LocalizedText, message: LocalizedText) -> Self {
        Self { title, message }
    }
}

fn date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn booking_confirmed(reference: &str, travel_date: NaiveDate) -> Template {
    let travel_date = date(travel_date);
    Template::new(
        LocalizedText::new("Booking Confirmed!", "تم تأكيد الحجز!"),
        LocalizedText::new(
            format!(
                "Your booking #{} has been confirmed. Travel date: {}",
                reference, travel_date
            ),
            format!("تم تأكيد حجزك رقم #{}. تاريخ السفر: {}", reference, travel_date),
        ),
    )
}

pub fn booking_cancelled(reference: &str, reason: Option<&str>) -> Template {
    let (reason_en, reason_ar) = match reason {
        Some(reason) => (format!(" Reason: {}", reason), format!(" السبب: {}", reason)),
        None => (String::new(), String::new()),
    };
    Template::new(
        LocalizedText::new("Booking Cancelled", "تم إلغاء الحجز"),
        LocalizedText::new(
            format!("Your booking #{} has been cancelled.{}", reference, reason_en),
            format!("تم إلغاء حجزك رقم #{}.{}", reference, reason_ar),
        ),
    )
}

pub fn booking_updated(reference: &str, changes: &str) -> Template {
    Template::new(
        LocalizedText::new("Booking Updated", "تم تحديث الحجز"),
        LocalizedText::new(
            format!("Your booking #{} has been updated: {}", reference, changes),
            format!("تم تحديث حجزك رقم #{}: {}", reference, changes),
        ),
    )
}

pub fn payment_success(amount_paid: f64, currency: &str) -> Template {
    let value = amount(amount_paid);
    Template::new(
        LocalizedText::new("Payment Successful!", "تم الدفع بنجاح!"),
        LocalizedText::new(
            format!(
                "Your payment of {} {} has been processed successfully.",
                currency, value
            ),
            format!("تم معالجة دفعتك بقيمة {} {} بنجاح.", value, currency),
        ),
    )
}

pub fn payment_failed(amount_due: f64, currency: &str, reason: Option<&str>) -> Template {
    let value = amount(amount_due);
    let (reason_en, reason_ar) = match reason {
        Some(reason) => (format!(" Reason: {}.", reason), format!(" السبب: {}.", reason)),
        None => (String::new(), String::new()),
    };
    Template::new(
        LocalizedText::new("Payment Failed", "فشل في الدفع"),
        LocalizedText::new(
            format!(
                "Your payment of {} {} could not be processed.{} Please try again.",
                currency, value, reason_en
            ),
            format!(
                "لم يتم معالجة دفعتك بقيمة {} {}.{} يرجى المحاولة مرة أخرى.",
                value, currency, reason_ar
            ),
        ),
    )
}

pub fn payment_refunded(amount_refunded: f64, currency: &str, booking_reference: &str) -> Template {
    let value = amount(amount_refunded);
    Template::new(
        LocalizedText::new("Payment Refunded", "تم استرداد المبلغ"),
        LocalizedText::new(
            format!(
                "A refund of {} {} for booking #{} has been issued.",
                currency, value, booking_reference
            ),
            format!(
                "تم إصدار استرداد بقيمة {} {} للحجز رقم #{}.",
                value, currency, booking_reference
            ),
        ),
    )
}

pub fn package_update(package_title_en: &str, package_title_ar: &str, details: &str) -> Template {
    Template::new(
        LocalizedText::new("📦 Package Update", "📦 تحديث الحزمة"),
        LocalizedText::new(
            format!("Your package '{}' has been updated: {}", package_title_en, details),
            format!("تم تحديث حزمتك '{}': {}", package_title_ar, details),
        ),
    )
}

pub fn review_added(package_title: &str) -> Template {
    Template::new(
        LocalizedText::new("⭐ New Review Added", "⭐ تم إضافة تقييم جديد"),
        LocalizedText::new(
            format!(
                "Thank you for your review of {}! Your feedback helps us improve our services.",
                package_title
            ),
            format!(
                "شكراً لك على تقييمك لـ {}! ملاحظاتك تساعدنا في تحسين خدماتنا.",
                package_title
            ),
        ),
    )
}

pub fn welcome() -> Template {
    Template::new(
        LocalizedText::new(
            "👋 Welcome to Dubai Travel Agency!",
            "👋 مرحباً بك في وكالة دبي للسفر!",
        ),
        LocalizedText::new(
            "Welcome aboard! We're thrilled to have you as part of our travel family. \
                Get ready for amazing adventures!",
            "مرحباً بك على متن! نحن متحمسون لانضمامك إلى عائلة السفر لدينا. \
                استعد للمغامرات المذهلة!",
        ),
    )
}

/// One hour before departure gets the final reminder, anything else the day-before one.
pub fn travel_reminder(
    hours_before: u32,
    package_title_en: &str,
    package_title_ar: &str,
) -> Template {
    if hours_before <= 1 {
        Template::new(
            LocalizedText::new(
                "🚀 Final Reminder - Departure in 1 Hour!",
                "🚀 التذكير الأخير - المغادرة خلال ساعة!",
            ),
            LocalizedText::new(
                format!(
                    "Your departure for {} is in 1 hour! \
                        Please make your way to the meeting point. Safe travels!",
                    package_title_en
                ),
                format!(
                    "مغادرتك إلى {} خلال ساعة! يرجى التوجه إلى نقطة الالتقاء. رحلة سعيدة!",
                    package_title_ar
                ),
            ),
        )
    } else {
        Template::new(
            LocalizedText::new("⏰ Travel Reminder - Tomorrow!", "⏰ تذكير السفر - غداً!"),
            LocalizedText::new(
                format!(
                    "Your travel adventure with {} starts tomorrow! \
                        Please ensure you have all necessary documents and arrive on time.",
                    package_title_en
                ),
                format!(
                    "مغامرة السفر لديك مع {} تبدأ غداً! \
                        يرجى التأكد من وجود جميع المستندات اللازمة والوصول في الوقت المحدد.",
                    package_title_ar
                ),
            ),
        )
    }
}

pub fn weather_update(weather_info: &str) -> Template {
    Template::new(
        LocalizedText::new("🌤️ Weather Update", "🌤️ تحديث الطقس"),
        LocalizedText::new(
            format!(
                "Weather conditions for your travel date have been updated. \
                    Please check the latest forecast. {}",
                weather_info
            ),
            format!(
                "تم تحديث ظروف الطقس لتاريخ سفرك. يرجى التحقق من أحدث التوقعات. {}",
                weather_info
            ),
        ),
    )
}

pub fn promotion(title: &str, message: &str) -> Template {
    let title = format!("🎁 {}", title);
    Template::new(
        LocalizedText::new(title.clone(), title),
        LocalizedText::new(message, message),
    )
}

pub fn cancellation_policy() -> Template {
    Template::new(
        LocalizedText::new("📋 Cancellation Policy Reminder", "📋 تذكير سياسة الإلغاء"),
        LocalizedText::new(
            "Please review our cancellation policy. \
                Free cancellation is available up to 24 hours before departure.",
            "يرجى مراجعة سياسة الإلغاء لدينا. الإلغاء المجاني متاح حتى 24 ساعة قبل المغادرة.",
        ),
    )
}

/// Generic text for a type, used when a notification carries no event details.
pub fn default_for(notification_type: NotificationType) -> Template {
    let (title, message) = match notification_type {
        NotificationType::BookingConfirmed => (
            LocalizedText::new("🎉 Booking Confirmed!", "🎉 تم تأكيد الحجز!"),
            LocalizedText::new(
                "Your booking has been confirmed successfully. \
                    We're excited to have you join us on this amazing journey!",
                "تم تأكيد حجزك بنجاح. نحن متحمسون لانضمامك إلينا في هذه الرحلة المذهلة!",
            ),
        ),
        NotificationType::BookingCancelled => (
            LocalizedText::new("❌ Booking Cancelled", "❌ تم إلغاء الحجز"),
            LocalizedText::new(
                "Your booking has been cancelled. \
                    If you have any questions, please contact our support team.",
                "تم إلغاء حجزك. إذا كان لديك أي أسئلة، يرجى الاتصال بفريق الدعم لدينا.",
            ),
        ),
        NotificationType::PaymentSuccess => (
            LocalizedText::new("✅ Payment Successful!", "✅ تم الدفع بنجاح!"),
            LocalizedText::new(
                "Your payment has been processed successfully. \
                    Thank you for choosing our services!",
                "تم معالجة دفعتك بنجاح. شكراً لاختيارك خدماتنا!",
            ),
        ),
        NotificationType::PaymentFailed => (
            LocalizedText::new("⚠️ Payment Failed", "⚠️ فشل في الدفع"),
            LocalizedText::new(
                "Your payment could not be processed. \
                    Please check your payment details and try again.",
                "لم يتم معالجة دفعتك. يرجى التحقق من تفاصيل الدفع والمحاولة مرة أخرى.",
            ),
        ),
        NotificationType::PackageUpdate => (
            LocalizedText::new("📦 Package Update", "📦 تحديث الحزمة"),
            LocalizedText::new(
                "There's an update to one of your booked packages. \
                    Please check the details for any changes.",
                "هناك تحديث على إحدى الحزم المحجوزة لديك. يرجى التحقق من التفاصيل لأي تغييرات.",
            ),
        ),
        NotificationType::ReviewAdded => (
            LocalizedText::new("⭐ New Review Added", "⭐ تم إضافة تقييم جديد"),
            LocalizedText::new(
                "Thank you for your review! Your feedback helps us improve our services.",
                "شكراً لك على تقييمك! ملاحظاتك تساعدنا في تحسين خدماتنا.",
            ),
        ),
        NotificationType::AdminAnnouncement => (
            LocalizedText::new("📢 Important Announcement", "📢 إعلان مهم"),
            LocalizedText::new(
                "We have an important announcement for all our valued customers.",
                "لدينا إعلان مهم لجميع عملائنا الكرام.",
            ),
        ),
        NotificationType::Reminder => (
            LocalizedText::new("⏰ Reminder", "⏰ تذكير"),
            LocalizedText::new(
                "This is a friendly reminder about your upcoming travel plans.",
                "هذا تذكير ودود حول خطط السفر القادمة لديك.",
            ),
        ),
        NotificationType::Promotion => (
            LocalizedText::new("🎁 Special Offer!", "🎁 عرض خاص!"),
            LocalizedText::new(
                "Don't miss out on our exclusive travel deals and special offers!",
                "لا تفوت عروض السفر الحصرية والعروض الخاصة لدينا!",
            ),
        ),
        NotificationType::BookingUpdated
        | NotificationType::PaymentRefunded => (
            LocalizedText::new("Notification", "إشعار"),
            LocalizedText::new("You have a new notification", "لديك إشعار جديد"),
        ),
    };
    Template::new(title, message)
}
