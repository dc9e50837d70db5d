//! Transactional email templates in Spanish and English.
//!
//! Anything interpolated from user input goes through `escape_html`.

use super::EmailMessage;
use crate::models::{ContactSubmission, Locale};

/// Escape text for safe inclusion in HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(locale: Locale, heading: &str, body: &str, footer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head><meta charset="utf-8"><title>{heading}</title></head>
<body style="font-family: Helvetica, Arial, sans-serif; color: #1a1a1a; max-width: 560px; margin: 0 auto; padding: 24px;">
<h1 style="font-size: 22px; font-weight: 600;">{heading}</h1>
{body}
<hr style="border: none; border-top: 1px solid #e5e5e5; margin: 32px 0 16px;">
<p style="font-size: 12px; color: #777;">{footer}</p>
</body>
</html>"#,
        lang = locale.as_str(),
        heading = heading,
        body = body,
        footer = footer,
    )
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<p><a href="{}" style="display: inline-block; background: #1a1a1a; color: #fff; padding: 12px 20px; text-decoration: none; border-radius: 4px;">{}</a></p>"#,
        escape_html(href),
        label
    )
}

/// Double opt-in email with the verification link.
pub fn verification(locale: Locale, to: &str, verify_url: &str, unsubscribe_url: &str) -> EmailMessage {
    let (subject, heading, intro, cta, footer) = match locale {
        Locale::Es => (
            "Confirma tu suscripción",
            "Confirma tu suscripción",
            "Gracias por suscribirte a nuestro boletín. Confirma tu dirección de correo para empezar a recibirlo.",
            "Confirmar suscripción",
            "Si no te has suscrito, ignora este mensaje o",
        ),
        Locale::En => (
            "Confirm your subscription",
            "Confirm your subscription",
            "Thanks for subscribing to our newsletter. Please confirm your email address to start receiving it.",
            "Confirm subscription",
            "If you did not subscribe, ignore this message or",
        ),
    };
    let unsubscribe_label = locale.pick("date de baja aquí", "unsubscribe here");

    EmailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        html: layout(
            locale,
            heading,
            &format!("<p>{}</p>{}", intro, button(verify_url, cta)),
            &format!(
                r#"{} <a href="{}">{}</a>."#,
                footer,
                escape_html(unsubscribe_url),
                unsubscribe_label
            ),
        ),
    }
}

/// Sent once the address is verified.
pub fn welcome(locale: Locale, to: &str, site_url: &str, unsubscribe_url: &str) -> EmailMessage {
    let (subject, intro, cta) = match locale {
        Locale::Es => (
            "¡Bienvenido a nuestro boletín!",
            "Tu suscripción está confirmada. Te escribiremos cuando tengamos proyectos y novedades que compartir.",
            "Visitar el sitio",
        ),
        Locale::En => (
            "Welcome to our newsletter!",
            "Your subscription is confirmed. We will write when we have new projects and news to share.",
            "Visit the site",
        ),
    };
    let footer = locale.pick(
        "Puedes darte de baja en cualquier momento:",
        "You can unsubscribe at any time:",
    );
    let unsubscribe_label = locale.pick("darme de baja", "unsubscribe");

    EmailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        html: layout(
            locale,
            subject,
            &format!("<p>{}</p>{}", intro, button(site_url, cta)),
            &format!(
                r#"{} <a href="{}">{}</a>"#,
                footer,
                escape_html(unsubscribe_url),
                unsubscribe_label
            ),
        ),
    }
}

/// Sent after unsubscribing.
pub fn goodbye(locale: Locale, to: &str, site_url: &str) -> EmailMessage {
    let (subject, intro, cta) = match locale {
        Locale::Es => (
            "Te has dado de baja",
            "Hemos eliminado tu dirección de nuestro boletín. Lamentamos verte marchar. Puedes volver a suscribirte desde nuestro sitio cuando quieras.",
            "Volver a suscribirme",
        ),
        Locale::En => (
            "You have been unsubscribed",
            "We have removed your address from our newsletter. Sorry to see you go. You can subscribe again from our site whenever you like.",
            "Subscribe again",
        ),
    };

    EmailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        html: layout(
            locale,
            subject,
            &format!("<p>{}</p>{}", intro, button(site_url, cta)),
            "",
        ),
    }
}

/// Notification of a new contact form submission, for the site owner.
pub fn contact_notification(locale: Locale, to: &str, submission: &ContactSubmission) -> EmailMessage {
    let (prefix, heading, from_label, subject_label, message_label) = match locale {
        Locale::Es => ("Nuevo mensaje de contacto", "Nuevo mensaje desde el sitio", "De", "Asunto", "Mensaje"),
        Locale::En => ("New contact message", "New message from the site", "From", "Subject", "Message"),
    };

    let body = format!(
        r#"<p><strong>{}:</strong> {} &lt;{}&gt;</p>
<p><strong>{}:</strong> {}</p>
<p><strong>{}:</strong></p>
<p style="white-space: pre-wrap;">{}</p>"#,
        from_label,
        escape_html(&submission.name),
        escape_html(&submission.email),
        subject_label,
        escape_html(&submission.subject),
        message_label,
        escape_html(&submission.message),
    );

    EmailMessage {
        to: to.to_string(),
        subject: format!("{}: {}", prefix, submission.subject),
        html: layout(locale, heading, &body, &submission.id),
    }
}

/// Acknowledgement sent to whoever filled in the contact form.
pub fn contact_ack(locale: Locale, submission: &ContactSubmission) -> EmailMessage {
    let (subject, greeting, intro, quote_label) = match locale {
        Locale::Es => (
            "Hemos recibido tu mensaje",
            "Hola",
            "Gracias por escribirnos. Hemos recibido tu mensaje y te responderemos lo antes posible.",
            "Tu mensaje",
        ),
        Locale::En => (
            "We received your message",
            "Hi",
            "Thanks for getting in touch. We received your message and will reply as soon as possible.",
            "Your message",
        ),
    };

    let body = format!(
        r#"<p>{} {},</p>
<p>{}</p>
<p><strong>{}:</strong> {}</p>
<blockquote style="white-space: pre-wrap; border-left: 3px solid #e5e5e5; margin: 0; padding-left: 12px;">{}</blockquote>"#,
        greeting,
        escape_html(&submission.name),
        intro,
        quote_label,
        escape_html(&submission.subject),
        escape_html(&submission.message),
    );

    EmailMessage {
        to: submission.email.clone(),
        subject: subject.to_string(),
        html: layout(locale, subject, &body, ""),
    }
}
